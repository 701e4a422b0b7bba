//! Lifecycle scenarios driven through the public queue API.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use opvisor::{BlockObserver, BlockOperation, OperationError, OperationQueue};

#[tokio::test(start_paused = true)]
async fn dependent_observes_dependency_finished() {
    let queue = OperationQueue::new();
    let observed_finished = Arc::new(AtomicBool::new(false));

    let a = BlockOperation::arc(|_op| async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        Ok(())
    });
    let seen = Arc::clone(&observed_finished);
    let watched = Arc::clone(&a);
    let b = BlockOperation::arc(move |_op| async move {
        seen.store(
            watched.is_finished() && !watched.is_cancelled(),
            Ordering::SeqCst,
        );
        Ok(())
    });
    b.add_dependency(Arc::clone(&a));

    queue.add_operations([a, b]);
    queue.wait_idle().await;

    assert!(observed_finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn cancelled_dependency_still_unblocks_the_dependent() {
    let queue = OperationQueue::new();
    let ran = Arc::new(AtomicBool::new(false));

    let a = BlockOperation::arc(|_op| async { Ok(()) });
    a.cancel();
    let flag = Arc::clone(&ran);
    let b = BlockOperation::arc(move |_op| async move {
        flag.store(true, Ordering::SeqCst);
        Ok(())
    });
    b.add_dependency(Arc::clone(&a));

    queue.add_operations([a, b]);
    queue.wait_idle().await;

    assert!(ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn cancel_before_dispatch_never_runs_the_body() {
    let queue = OperationQueue::new();
    let ran = Arc::new(AtomicBool::new(false));

    let flag = Arc::clone(&ran);
    let op = BlockOperation::arc(move |_op| async move {
        flag.store(true, Ordering::SeqCst);
        Ok(())
    });
    op.cancel();
    queue.add_operation(Arc::clone(&op));
    queue.wait_idle().await;

    assert!(!ran.load(Ordering::SeqCst));
    assert!(op.is_finished());
    assert!(op.is_cancelled());
}

#[tokio::test]
async fn cancel_while_waiting_on_dependencies_concludes_promptly() {
    let queue = OperationQueue::new();

    // The dependency blocks until it is cancelled at the end of the test.
    let blocker = BlockOperation::arc(|op| async move {
        op.wait().await;
        Ok(())
    });
    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    let waiting = BlockOperation::arc(move |_op| async move {
        flag.store(true, Ordering::SeqCst);
        Ok(())
    });
    waiting.add_dependency(Arc::clone(&blocker));

    queue.add_operations([Arc::clone(&blocker), Arc::clone(&waiting)]);
    tokio::task::yield_now().await;

    waiting.cancel();
    waiting.wait().await;
    assert!(waiting.is_cancelled());
    assert!(!ran.load(Ordering::SeqCst));
    assert!(!blocker.is_finished(), "dependency keeps running on its own");

    blocker.cancel();
    queue.wait_idle().await;
}

#[tokio::test]
async fn finish_notifications_are_delivered_exactly_once() {
    let queue = OperationQueue::new();
    let notifications = Arc::new(AtomicUsize::new(0));

    let op = BlockOperation::arc(|op| async move {
        op.finish();
        op.finish_with([OperationError::failed("too late")]);
        op.cancel();
        Ok(())
    });
    let counter = Arc::clone(&notifications);
    op.add_observer(BlockObserver::on_finish(move |_, cancelled, errors| {
        assert!(!cancelled);
        assert!(errors.is_empty());
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    queue.add_operation(Arc::clone(&op));
    queue.wait_idle().await;

    assert_eq!(notifications.load(Ordering::SeqCst), 1);

    // Added post-finish: fires immediately, also exactly once.
    let late = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&late);
    op.add_observer(BlockObserver::on_finish(move |_, _, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    assert_eq!(late.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn body_errors_surface_in_the_error_list() {
    let queue = OperationQueue::new();

    let op = BlockOperation::arc(|_op| async { Err(OperationError::failed("no luck")) });
    queue.add_operation(Arc::clone(&op));
    queue.wait_idle().await;

    assert!(op.is_finished());
    assert!(!op.is_cancelled());
    assert_eq!(op.errors(), [OperationError::failed("no luck")]);
}
