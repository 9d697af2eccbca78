// 可观察单元 - 状态值的发布/订阅
//
// 每次 set 同步通知当前所有订阅者（按订阅顺序）
// 通知前先复制订阅者列表并释放锁，订阅者回调中可以再次 set 或取消订阅

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type Subscribers<T> = Mutex<BTreeMap<u64, Callback<T>>>;

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// 可观察的可变单元
///
/// 不缓存历史值：set 之后才订阅的回调不会收到这次变更
pub struct Observable<T> {
    value: Mutex<T>,
    subscribers: Arc<Subscribers<T>>,
    next_id: AtomicU64,
}

impl<T: Clone + Send + 'static> Observable<T> {
    /// 创建带初始值的单元
    pub fn new(initial: T) -> Self {
        Self {
            value: Mutex::new(initial),
            subscribers: Arc::new(Mutex::new(BTreeMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// 最后一次 set 的值
    pub fn get(&self) -> T {
        lock(&self.value).clone()
    }

    /// 写入新值并通知订阅者
    pub fn set(&self, value: T) {
        *lock(&self.value) = value.clone();
        self.notify(&value);
    }

    /// 基于当前值计算新值，读和写之间不会被其他 set 插入
    pub fn update<F>(&self, f: F) -> T
    where
        F: FnOnce(&T) -> T,
    {
        let value = {
            let mut guard = lock(&self.value);
            let next = f(&guard);
            *guard = next.clone();
            next
        };
        self.notify(&value);
        value
    }

    /// 订阅变更，返回的句柄用于取消订阅
    pub fn observe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.subscribers).insert(id, Arc::new(callback));

        let weak: Weak<Subscribers<T>> = Arc::downgrade(&self.subscribers);
        Subscription {
            id,
            remove: Some(Box::new(move |id| {
                if let Some(subscribers) = weak.upgrade() {
                    lock(&subscribers).remove(&id);
                }
            })),
        }
    }

    /// 当前订阅者数量
    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }

    fn notify(&self, value: &T) {
        let snapshot: Vec<Callback<T>> = lock(&self.subscribers).values().cloned().collect();
        tracing::trace!("状态已更新，订阅者数量: {}", snapshot.len());
        for callback in snapshot {
            callback(value);
        }
    }
}

impl<T: Clone + Default + Send + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// 订阅句柄
///
/// 调用 `unsubscribe` 取消；直接 drop 不会取消订阅
pub struct Subscription {
    id: u64,
    remove: Option<Box<dyn FnOnce(u64) + Send + Sync>>,
}

impl Subscription {
    /// 取消订阅
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_notifies_in_order() {
        let cell = Observable::new(0);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = seen.clone();
        let _a = cell.observe(move |v| first.lock().unwrap().push(("a", *v)));
        let second = seen.clone();
        let _b = cell.observe(move |v| second.lock().unwrap().push(("b", *v)));

        cell.set(7);

        assert_eq!(cell.get(), 7);
        assert_eq!(*seen.lock().unwrap(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn test_late_subscriber_does_not_see_previous_value() {
        let cell = Observable::new("initial".to_string());
        cell.set("first".to_string());

        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = seen.clone();
        let _sub = cell.observe(move |v| sink.lock().unwrap().push(v.clone()));

        assert!(seen.lock().unwrap().is_empty());
        cell.set("second".to_string());
        assert_eq!(*seen.lock().unwrap(), vec!["second".to_string()]);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let cell = Observable::new(0);
        let count = Arc::new(AtomicU64::new(0));
        let counter = count.clone();
        let sub = cell.observe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        cell.set(1);
        sub.unsubscribe();
        cell.set(2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(cell.subscriber_count(), 0);
    }

    #[test]
    fn test_reentrant_set_from_subscriber() {
        let cell = Arc::new(Observable::new(0));
        let inner = Arc::downgrade(&cell);
        let _sub = cell.observe(move |v| {
            // 订阅者内部再次写入不能死锁
            if *v < 3 {
                if let Some(cell) = inner.upgrade() {
                    cell.set(v + 1);
                }
            }
        });

        cell.set(1);
        assert_eq!(cell.get(), 3);
    }

    #[test]
    fn test_update_applies_to_current_value() {
        let cell = Observable::new(10);
        let result = cell.update(|v| v * 2);
        assert_eq!(result, 20);
        assert_eq!(cell.get(), 20);
    }
}
