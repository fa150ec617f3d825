//! Integration tests for the columnarizer.
//!
//! These tests drive a `Columnarizer` through the operator, metadata and
//! lifecycle protocols against scripted row sources.

use std::sync::Arc;

use nexus_colexec::testing::ScriptedSource;
use nexus_colexec::{
    Allocator, Closer, ColumnType, Columnarizer, ColumnarizerMode, ComponentStats, Datum,
    EncDatum, EncDatumRow, FlowCtx, MemoryMonitor, MetadataSource, OpNode, Operator, ProcState,
    ProducerMetadata, RowSource, ValuesSource,
};
use nexus_common::{ColExecConfig, NexusError, UNLIMITED_MEMORY};
use tracing_subscriber::EnvFilter;

/// Routes executor logs to the test output. Set `RUST_LOG=nexus_colexec=trace`
/// to see them.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

fn typs() -> Vec<ColumnType> {
    vec![ColumnType::Int64, ColumnType::String]
}

fn row(id: i64, name: &str) -> EncDatumRow {
    EncDatumRow::new(vec![
        EncDatum::encode(&Datum::bigint(id)),
        EncDatum::encode(&Datum::string(name)),
    ])
}

fn notice(msg: &str) -> ProducerMetadata {
    ProducerMetadata::Notice(msg.to_string())
}

fn allocator(batch_size: usize) -> Arc<Allocator> {
    Arc::new(Allocator::with_batch_size(
        Arc::new(MemoryMonitor::unlimited("test")),
        batch_size,
    ))
}

/// Context that does not collect statistics, so drained metadata only
/// contains what the input produced.
fn quiet_ctx() -> FlowCtx {
    FlowCtx::new("quiet", ColExecConfig::for_testing().with_stats(false))
        .expect("valid test config")
}

fn columnarizer(src: ScriptedSource, mode: ColumnarizerMode, batch_size: usize) -> Columnarizer {
    init_tracing();
    Columnarizer::new(&quiet_ctx(), allocator(batch_size), 1, Box::new(src), mode)
}

/// Pulls until the end of the stream, returning the rows of every batch.
fn collect_batches(op: &mut Columnarizer) -> Vec<Vec<Vec<Datum>>> {
    let mut batches = Vec::new();
    loop {
        let batch = op.next().expect("pull failed");
        assert!(batch.length() <= batch.capacity());
        if batch.is_empty() {
            return batches;
        }
        batches.push(batch.rows().collect());
    }
}

#[test]
fn test_rows_then_meta_then_end_of_stream() {
    let src = ScriptedSource::new(typs())
        .row(row(1, "a"))
        .row(row(2, "b"))
        .meta(notice("m"));
    let mut op = columnarizer(src, ColumnarizerMode::Buffering, 1024);
    op.init().unwrap();

    // Capacity starts at one row and doubles with every replacement.
    let batches = collect_batches(&mut op);
    assert_eq!(
        batches,
        vec![
            vec![vec![Datum::bigint(1), Datum::string("a")]],
            vec![vec![Datum::bigint(2), Datum::string("b")]],
        ]
    );

    let drained: Vec<String> = op.drain_meta().iter().map(ToString::to_string).collect();
    assert_eq!(drained, vec!["notice: m"]);
}

#[test]
fn test_two_rows_fill_one_batch_once_capacity_allows() {
    let src = ScriptedSource::new(typs())
        .row(row(0, "warmup"))
        .row(row(1, "a"))
        .row(row(2, "b"))
        .meta(notice("m"));
    let mut op = columnarizer(src, ColumnarizerMode::Buffering, 1024);
    op.init().unwrap();

    assert_eq!(op.next().unwrap().length(), 1);
    let batch = op.next().unwrap();
    assert_eq!(batch.capacity(), 2);
    assert_eq!(
        batch.rows().collect::<Vec<_>>(),
        vec![
            vec![Datum::bigint(1), Datum::string("a")],
            vec![Datum::bigint(2), Datum::string("b")],
        ]
    );
    assert_eq!(op.next().unwrap().length(), 0);
    assert_eq!(op.drain_meta().len(), 1);
}

#[test]
fn test_streaming_reuses_single_batch() {
    let alloc = allocator(1024);
    let src = ScriptedSource::new(typs()).row(row(1, "a")).row(row(2, "b"));
    let mut op = Columnarizer::new_streaming(&quiet_ctx(), alloc.clone(), 1, Box::new(src));
    op.init().unwrap();

    let first = op.next().unwrap();
    assert_eq!(first.length(), 1);
    assert_eq!(first.capacity(), 1);
    assert_eq!(first.row(0).unwrap(), vec![Datum::bigint(1), Datum::string("a")]);
    let first_ptr: *const _ = first;

    let second = op.next().unwrap();
    assert_eq!(second.length(), 1);
    assert_eq!(second.row(0).unwrap(), vec![Datum::bigint(2), Datum::string("b")]);
    assert!(std::ptr::eq(first_ptr, second));

    assert_eq!(op.next().unwrap().length(), 0);
    assert_eq!(alloc.usage().batch_allocations, 1);
}

#[test]
fn test_streaming_never_exceeds_one_row() {
    let rows = (0..20).map(|i| row(i, "x"));
    let src = ScriptedSource::with_rows(typs(), rows);
    let mut op = columnarizer(src, ColumnarizerMode::Streaming, 1024);
    op.init().unwrap();

    let batches = collect_batches(&mut op);
    assert_eq!(batches.len(), 20);
    assert!(batches.iter().all(|b| b.len() == 1));
}

#[test]
fn test_error_meta_aborts_pull_after_staged_row() {
    let src = ScriptedSource::new(typs())
        .row(row(1, "a"))
        .row(row(2, "b"))
        .error(NexusError::execution_failed("division by zero"));
    let mut op = columnarizer(src, ColumnarizerMode::Buffering, 1024);
    op.init().unwrap();

    // The first pull has capacity one, the second stages a row and then
    // hits the error.
    assert_eq!(op.next().unwrap().length(), 1);
    let err = op.next().unwrap_err();
    assert!(!err.is_internal());
    assert!(matches!(err.inner(), NexusError::ExecutionFailed { .. }));

    // The error is not accumulated as ordinary metadata.
    assert!(op.drain_meta().is_empty());
    op.close().unwrap();
}

#[test]
fn test_internal_error_meta_stays_internal() {
    let src = ScriptedSource::new(typs()).error(NexusError::internal("corrupt stream"));
    let mut op = columnarizer(src, ColumnarizerMode::Buffering, 1024);
    op.init().unwrap();
    assert!(op.next().unwrap_err().is_internal());
}

#[test]
fn test_init_twice_starts_input_once() {
    let src = ScriptedSource::new(typs());
    let recorder = src.recorder();
    let mut op = columnarizer(src, ColumnarizerMode::Buffering, 1024);
    op.init().unwrap();
    op.init().unwrap();
    assert_eq!(recorder.get().start, 1);
}

#[test]
fn test_close_twice_notifies_input_once() {
    let src = ScriptedSource::new(typs()).row(row(1, "a"));
    let recorder = src.recorder();
    let mut op = columnarizer(src, ColumnarizerMode::Buffering, 1024);
    op.init().unwrap();
    op.next().unwrap();

    op.close().unwrap();
    op.close().unwrap();
    assert_eq!(recorder.get().consumer_closed, 1);
}

#[test]
fn test_close_error_is_suppressed() {
    let src = ScriptedSource::new(typs()).fail_close(NexusError::execution_failed("teardown"));
    let recorder = src.recorder();
    let mut op = columnarizer(src, ColumnarizerMode::Buffering, 1024);
    op.init().unwrap();
    assert!(op.close().is_ok());
    assert_eq!(recorder.get().consumer_closed, 1);
}

#[test]
fn test_close_mid_iteration_releases_memory() {
    let monitor = Arc::new(MemoryMonitor::new("flow", UNLIMITED_MEMORY));
    let alloc = Arc::new(Allocator::with_batch_size(monitor.clone(), 8));
    let src = ScriptedSource::with_rows(typs(), (0..10).map(|i| row(i, "x")));
    let mut op = Columnarizer::new_buffering(&quiet_ctx(), alloc, 1, Box::new(src));
    op.init().unwrap();
    op.next().unwrap();
    op.next().unwrap();
    assert!(monitor.usage().used > 0);

    op.close().unwrap();
    assert_eq!(monitor.usage().used, 0);
    assert!(op.next().unwrap_err().is_internal());
}

#[test]
fn test_metadata_delivered_once_in_order() {
    let src = ScriptedSource::new(typs())
        .meta(notice("1"))
        .row(row(1, "a"))
        .meta(notice("2"))
        .meta(notice("3"))
        .row(row(2, "b"))
        .row(row(3, "c"))
        .meta(notice("4"))
        .trailing_meta(notice("5"));
    let mut op = columnarizer(src, ColumnarizerMode::Buffering, 1024);
    op.init().unwrap();
    collect_batches(&mut op);

    let first: Vec<String> = op.drain_meta().iter().map(ToString::to_string).collect();
    assert_eq!(
        first,
        vec!["notice: 1", "notice: 2", "notice: 3", "notice: 4", "notice: 5"]
    );
    assert!(op.drain_meta().is_empty());
    assert_eq!(op.proc_state(), ProcState::Exhausted);
}

#[test]
fn test_early_drain_discards_rows_and_keeps_meta() {
    let src = ScriptedSource::new(typs())
        .row(row(1, "a"))
        .row(row(2, "b"))
        .meta(notice("late"))
        .row(row(3, "c"));
    let recorder = src.recorder();
    let mut op = columnarizer(src, ColumnarizerMode::Buffering, 1024);
    op.init().unwrap();
    op.next().unwrap();

    let drained: Vec<String> = op.drain_meta().iter().map(ToString::to_string).collect();
    assert_eq!(drained, vec!["notice: late"]);
    assert_eq!(recorder.get().consumer_done, 1);
}

#[test]
fn test_drain_before_init_does_not_pull() {
    let src = ScriptedSource::new(typs()).meta(notice("never"));
    let recorder = src.recorder();
    let mut op = columnarizer(src, ColumnarizerMode::Buffering, 1024);
    assert!(op.drain_meta().is_empty());
    assert_eq!(recorder.get().next, 0);
}

#[test]
fn test_meta_only_pull_is_terminal() {
    let src = ScriptedSource::new(typs()).meta(notice("a")).meta(notice("b"));
    let mut op = columnarizer(src, ColumnarizerMode::Buffering, 1024);
    op.init().unwrap();
    assert_eq!(op.next().unwrap().length(), 0);
    assert_eq!(op.drain_meta().len(), 2);
}

#[test]
fn test_stats_emitted_as_trailing_meta() {
    let ctx = FlowCtx::for_testing();
    assert!(ctx.collect_stats());
    let src = ScriptedSource::with_rows(typs(), (0..5).map(|i| row(i, "x")))
        .trailing_meta(notice("upstream"));
    let mut op = Columnarizer::new_buffering(&ctx, allocator(4), 7, Box::new(src));
    op.init().unwrap();
    collect_batches(&mut op);

    let drained = op.drain_meta();
    assert_eq!(drained.len(), 2);
    assert_eq!(drained[0].to_string(), "notice: upstream");
    match &drained[1] {
        ProducerMetadata::ExecStats(stats) => {
            let ComponentStats {
                component,
                rows_read,
                batches_output,
                max_batch_len,
                ..
            } = stats;
            assert_eq!(component, "columnarizer-7");
            assert_eq!(*rows_read, 5);
            // 1 + 2 + 2, then the empty terminal batch.
            assert_eq!(*batches_output, 4);
            assert_eq!(*max_batch_len, 2);
        }
        other => panic!("expected stats, got {other}"),
    }
}

#[test]
fn test_buffer_length_matches_capacity_after_growth() {
    let src = ScriptedSource::with_rows(typs(), (0..40).map(|i| row(i, "x")));
    let mut op = columnarizer(src, ColumnarizerMode::Buffering, 16);
    op.init().unwrap();

    let mut capacities = Vec::new();
    loop {
        let len = op.next().unwrap().length();
        let capacity = op.batch_capacity().unwrap();
        assert_eq!(op.row_buffer_len(), capacity);
        capacities.push(capacity);
        if len == 0 {
            break;
        }
    }
    assert_eq!(capacities, vec![1, 2, 4, 8, 16, 16, 16]);
}

#[test]
fn test_budget_exceeded_is_expected_error() {
    let ctx = FlowCtx::new(
        "tight",
        ColExecConfig::for_testing()
            .with_batch_size(1024)
            .with_memory_limit(1024),
    )
    .unwrap();
    let alloc = Arc::new(ctx.new_allocator());
    let src = ScriptedSource::with_rows(typs(), (0..1000).map(|i| row(i, "x")));
    let mut op = Columnarizer::new_buffering(&ctx, alloc, 1, Box::new(src));
    op.init().unwrap();

    let err = loop {
        match op.next() {
            Ok(batch) => assert!(!batch.is_empty()),
            Err(err) => break err,
        }
    };
    assert!(!err.is_internal());
    assert!(matches!(err.inner(), NexusError::MemoryBudgetExceeded { .. }));
}

#[test]
fn test_start_error_propagates_from_init() {
    let src = ScriptedSource::new(typs()).fail_start(NexusError::internal("bad plan"));
    let mut op = columnarizer(src, ColumnarizerMode::Buffering, 1024);
    assert!(op.init().unwrap_err().is_internal());
}

#[test]
fn test_introspection() {
    let src = ScriptedSource::new(typs()).as_plan_node("tablereader");
    let op = columnarizer(src, ColumnarizerMode::Buffering, 1024);
    assert_eq!(op.name(), "columnarizer");
    assert_eq!(op.child_count(true), 1);
    assert_eq!(op.child(0, true).unwrap().name(), "tablereader");
    assert!(op.child(1, true).unwrap_err().is_internal());
    assert_eq!(op.output_types(), typs().as_slice());
    assert_eq!(op.input().output_types(), typs().as_slice());

    let op = columnarizer(ScriptedSource::new(typs()), ColumnarizerMode::Buffering, 1024);
    assert_eq!(op.child_count(false), 0);
    let err = op.child(0, false).unwrap_err();
    assert!(err.is_internal());
    assert!(err.to_string().contains("not an OpNode"));
}

#[test]
fn test_from_config_selects_mode() {
    let config = ColExecConfig::for_testing().with_columnarizer_mode("streaming");
    let ctx = FlowCtx::new("f", config).unwrap();
    let op = Columnarizer::from_config(
        &ctx,
        Arc::new(ctx.new_allocator()),
        1,
        Box::new(ScriptedSource::new(typs())),
    )
    .unwrap();
    assert_eq!(op.mode(), ColumnarizerMode::Streaming);
}

#[test]
fn test_over_values_source() {
    let rows = (0..100).map(|i| EncDatumRow::from_datums([Datum::int(i)])).collect();
    let src = ValuesSource::new(vec![ColumnType::Int32], rows);
    let ctx = quiet_ctx();
    let mut op = Columnarizer::new_buffering(&ctx, Arc::new(ctx.new_allocator()), 1, Box::new(src));
    op.init().unwrap();

    let values: Vec<Datum> = collect_batches(&mut op)
        .into_iter()
        .flatten()
        .map(|mut r| r.remove(0))
        .collect();
    assert_eq!(values, (0..100).map(Datum::int).collect::<Vec<_>>());
    assert_eq!(op.child(0, true).unwrap().name(), "values");
    op.close().unwrap();
}
