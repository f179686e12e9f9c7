use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use futures_util::future::join_all;

/// Apply an async transform to every item with at most `limit` transforms in
/// flight at once.
///
/// A fixed pool of `limit` worker futures shares a monotonically increasing
/// cursor; each worker claims the next unclaimed index, awaits the transform
/// for that index, writes the result into that slot, and loops. The output
/// therefore has the same length and index correspondence as the input
/// (`out[i]` is `transform(&items[i])`) no matter in which order transforms
/// complete, and one slow item only ever stalls its own worker.
///
/// Workers are plain futures joined in the calling task, so the whole run is
/// cooperative: nothing here needs `'static` or spawns threads.
pub async fn map_bounded<'a, T, R, F, Fut>(items: &'a [T], limit: usize, transform: F) -> Vec<R>
where
    F: Fn(&'a T) -> Fut,
    Fut: Future<Output = R>,
{
    assert!(limit > 0, "concurrency limit must be positive");

    let cursor = AtomicUsize::new(0);
    let slots: Mutex<Vec<Option<R>>> = Mutex::new((0..items.len()).map(|_| None).collect());

    {
        let (cursor, slots, transform) = (&cursor, &slots, &transform);
        let workers = (0..limit).map(|_| async move {
            loop {
                let idx = cursor.fetch_add(1, Ordering::SeqCst);
                if idx >= items.len() {
                    break;
                }
                let result = transform(&items[idx]).await;
                slots.lock().unwrap()[idx] = Some(result);
            }
        });
        join_all(workers).await;
    }

    slots
        .into_inner()
        .unwrap()
        .into_iter()
        .map(|slot| slot.expect("every claimed index stores a result"))
        .collect()
}
