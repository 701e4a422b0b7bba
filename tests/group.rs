//! Group composition scenarios.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use opvisor::{BlockOperation, GroupOperation, OperationQueue};

#[tokio::test]
async fn group_is_addressable_as_a_single_dependency() {
    let queue = OperationQueue::new();
    let completed = Arc::new(AtomicUsize::new(0));

    let children = (0..3).map(|_| {
        let counter = Arc::clone(&completed);
        BlockOperation::arc(move |_op| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    });
    let group = GroupOperation::new(children);

    let counter = Arc::clone(&completed);
    let after = BlockOperation::arc(move |_op| async move {
        // All three children finished before the dependent starts.
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        Ok(())
    });
    after.add_dependency(Arc::clone(group.handle()));

    queue.add_operations([Arc::clone(group.handle()), Arc::clone(&after)]);
    queue.wait_idle().await;

    assert!(group.is_finished());
    assert!(after.is_finished());
    assert!(!after.is_cancelled());
}

#[tokio::test]
async fn cancelling_a_group_stops_unstarted_children() {
    let queue = OperationQueue::builder().suspended(true).build();
    let ran = Arc::new(AtomicUsize::new(0));

    let children: Vec<_> = (0..3)
        .map(|_| {
            let counter = Arc::clone(&ran);
            BlockOperation::arc(move |_op| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })
        .collect();
    let group = GroupOperation::new(children.iter().cloned());

    queue.add_operation(Arc::clone(group.handle()));
    group.cancel();
    queue.resume();
    queue.wait_idle().await;

    assert!(group.is_cancelled());
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    for child in &children {
        assert!(child.is_cancelled());
    }
}

#[tokio::test]
async fn child_produced_operations_extend_the_group() {
    let queue = OperationQueue::new();
    let completed = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&completed);
    let producer = BlockOperation::arc(move |op| async move {
        let inner = Arc::clone(&counter);
        op.produce(BlockOperation::arc(move |_op| async move {
            inner.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let group = GroupOperation::new([producer]);

    queue.add_operation(Arc::clone(group.handle()));
    group.wait().await;

    assert_eq!(completed.load(Ordering::SeqCst), 2);
}
