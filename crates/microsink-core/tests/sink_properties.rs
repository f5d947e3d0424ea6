//! End-to-end behaviour of `BatchSink::add_batch`.

use std::sync::{Arc, Mutex};

use arrow::array::{Int32Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use async_trait::async_trait;
use datafusion::logical_expr::{col, lit, LogicalPlan, LogicalPlanBuilder};
use datafusion::physical_expr::expressions::col as physical_col;
use datafusion::physical_expr::{LexOrdering, PhysicalSortExpr};
use datafusion::physical_plan::Partitioning;

use microsink_core::{
    native_callback, BatchCallback, BatchSink, CallbackError, DataView, MaterializedBatch,
    SinkError, WriteMarker,
};

/// What the callback observed for one invocation.
#[derive(Debug, Clone)]
struct Seen {
    batch_id: i64,
    schema: SchemaRef,
    rows: Vec<(i32, String)>,
    partitioning: Partitioning,
    ordering: Option<LexOrdering>,
}

#[derive(Default)]
struct RecordingCallback {
    seen: Mutex<Vec<Seen>>,
}

#[async_trait]
impl BatchCallback for RecordingCallback {
    async fn call(&self, batch_id: i64, data: &DataView) -> Result<(), CallbackError> {
        let batches = data.collect().await.map_err(CallbackError::failed)?;
        let mut rows = Vec::new();
        for b in &batches {
            if b.num_columns() < 2 {
                continue;
            }
            let ids = b.column(0).as_any().downcast_ref::<Int32Array>().unwrap();
            let vals = b.column(1).as_any().downcast_ref::<StringArray>().unwrap();
            for i in 0..b.num_rows() {
                rows.push((ids.value(i), vals.value(i).to_string()));
            }
        }
        self.seen.lock().unwrap().push(Seen {
            batch_id,
            schema: data.schema(),
            rows,
            partitioning: data.partitioning().clone(),
            ordering: data.ordering().cloned(),
        });
        Ok(())
    }
}

fn id_val_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int32, false),
        Field::new("val", DataType::Utf8, false),
    ]))
}

/// Analyzed plan producing `{id: Int32, val: Utf8}`, wrapped in the write marker.
fn marked_id_val_plan() -> LogicalPlan {
    let plan = LogicalPlanBuilder::values(vec![vec![lit(0i32), lit("")]])
        .unwrap()
        .project(vec![col("column1").alias("id"), col("column2").alias("val")])
        .unwrap()
        .build()
        .unwrap();
    WriteMarker::wrap(plan)
}

fn id_val_rows(ids: Vec<i32>, vals: Vec<&str>) -> RecordBatch {
    RecordBatch::try_new(
        id_val_schema(),
        vec![
            Arc::new(Int32Array::from(ids)),
            Arc::new(StringArray::from(vals)),
        ],
    )
    .unwrap()
}

#[tokio::test]
async fn batch_id_passes_through_for_empty_batch() {
    let schema: SchemaRef = Arc::new(Schema::new(vec![Field::new("a", DataType::Int32, true)]));
    let plan = WriteMarker::wrap(
        LogicalPlanBuilder::values(vec![vec![lit(1i32)]])
            .unwrap()
            .project(vec![col("column1").alias("a")])
            .unwrap()
            .build()
            .unwrap(),
    );
    let batch = MaterializedBatch::single_partition(Arc::clone(&schema), vec![]);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let sink = BatchSink::new(native_callback(move |batch_id, view| {
        recorder
            .lock()
            .unwrap()
            .push((batch_id, view.num_rows(), view.schema()));
        Ok(())
    }));

    sink.add_batch(7, &batch, &schema, &plan).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, 7);
    assert_eq!(seen[0].1, 0);
    assert_eq!(seen[0].2, schema);
}

#[tokio::test]
async fn rows_and_order_are_delivered_unchanged() {
    let schema = id_val_schema();
    let ordering = LexOrdering::from(vec![PhysicalSortExpr {
        expr: physical_col("id", &schema).unwrap(),
        options: Default::default(),
    }]);
    let batch = MaterializedBatch::try_new(
        Arc::clone(&schema),
        vec![vec![id_val_rows(vec![1, 2], vec!["x", "y"])]],
        Partitioning::UnknownPartitioning(1),
        Some(ordering.clone()),
    )
    .unwrap();

    let callback = Arc::new(RecordingCallback::default());
    let sink = BatchSink::new(callback.clone());
    sink.add_batch(3, &batch, &schema, &marked_id_val_plan())
        .await
        .unwrap();

    let seen = callback.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].batch_id, 3);
    assert_eq!(seen[0].schema, schema);
    assert_eq!(
        seen[0].rows,
        vec![(1, "x".to_string()), (2, "y".to_string())]
    );
    // `Partitioning::eq` is never true for `UnknownPartitioning`.
    assert!(matches!(
        seen[0].partitioning,
        Partitioning::UnknownPartitioning(1)
    ));
    assert_eq!(seen[0].ordering, Some(ordering));
}

#[tokio::test]
async fn multi_partition_layout_is_carried_forward() {
    let schema = id_val_schema();
    let batch = MaterializedBatch::try_new(
        Arc::clone(&schema),
        vec![
            vec![id_val_rows(vec![5, 4], vec!["e", "d"])],
            vec![id_val_rows(vec![9], vec!["i"])],
            vec![],
        ],
        Partitioning::RoundRobinBatch(3),
        None,
    )
    .unwrap();

    let callback = Arc::new(RecordingCallback::default());
    let sink = BatchSink::new(callback.clone());
    sink.add_batch(0, &batch, &schema, &marked_id_val_plan())
        .await
        .unwrap();

    let seen = callback.seen.lock().unwrap();
    assert_eq!(seen[0].partitioning, Partitioning::RoundRobinBatch(3));
    assert_eq!(seen[0].ordering, None);
    // Partition order, no re-sorting.
    assert_eq!(
        seen[0].rows,
        vec![(5, "e".to_string()), (4, "d".to_string()), (9, "i".to_string())]
    );
}

#[tokio::test]
async fn schema_mismatch_is_invariant_violation_without_callback() {
    let callback = Arc::new(RecordingCallback::default());
    let sink = BatchSink::new(callback.clone());

    // The caller-facing schema renamed `val`; the analyzed plan did not.
    let original: SchemaRef = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int32, false),
        Field::new("value", DataType::Utf8, false),
    ]));
    let batch = MaterializedBatch::single_partition(
        id_val_schema(),
        vec![id_val_rows(vec![1], vec!["x"])],
    );

    let err = sink
        .add_batch(1, &batch, &original, &marked_id_val_plan())
        .await
        .unwrap_err();
    match &err {
        SinkError::InvariantViolation(mismatch) => assert_eq!(mismatch.position, Some(1)),
        other => panic!("unexpected: {other:?}"),
    }
    assert!(callback.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn plan_without_marker_is_accepted() {
    let schema = id_val_schema();
    let unmarked = microsink_core::MarkerEliminator::eliminate(&marked_id_val_plan()).clone();
    let batch = MaterializedBatch::single_partition(
        Arc::clone(&schema),
        vec![id_val_rows(vec![1], vec!["x"])],
    );

    let callback = Arc::new(RecordingCallback::default());
    let sink = BatchSink::new(callback.clone());
    sink.add_batch(2, &batch, &schema, &unmarked).await.unwrap();
    assert_eq!(callback.seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn each_successful_call_invokes_callback_once_in_order() {
    let schema = id_val_schema();
    let plan = marked_id_val_plan();
    let callback = Arc::new(RecordingCallback::default());
    let sink = BatchSink::new(callback.clone());

    let ids: Vec<i64> = (10..20).collect();
    for &id in &ids {
        let batch = MaterializedBatch::single_partition(
            Arc::clone(&schema),
            vec![id_val_rows(vec![id as i32], vec!["r"])],
        );
        sink.add_batch(id, &batch, &schema, &plan).await.unwrap();
    }

    let seen = callback.seen.lock().unwrap();
    let delivered: Vec<i64> = seen.iter().map(|s| s.batch_id).collect();
    assert_eq!(delivered, ids);
    for s in seen.iter() {
        assert_eq!(s.rows, vec![(s.batch_id as i32, "r".to_string())]);
    }
}

#[derive(Debug, thiserror::Error)]
#[error("sink table locked by {owner}")]
struct TableLocked {
    owner: String,
}

#[tokio::test]
async fn callback_failure_reaches_caller_unmodified() {
    let schema = id_val_schema();
    let sink = BatchSink::new(native_callback(|_, _| {
        Err(TableLocked {
            owner: "compactor".to_string(),
        }
        .into())
    }));
    let batch = MaterializedBatch::single_partition(Arc::clone(&schema), vec![]);

    let err = sink
        .add_batch(5, &batch, &schema, &marked_id_val_plan())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "callback failed: sink table locked by compactor");
    match err.into_callback_error() {
        Some(CallbackError::Failed(source)) => {
            let locked = source.downcast_ref::<TableLocked>().unwrap();
            assert_eq!(locked.owner, "compactor");
        }
        other => panic!("unexpected: {other:?}"),
    }
}
