// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex};

/// Snapshot of an upload's progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Bytes acknowledged by the server.
    pub transferred: u64,
    /// Total bytes of the upload.
    pub total: u64,
}

/// ProgressListener is notified every time the progress moves forward.
///
/// Listeners are called on the coordinator's task and must not block.
pub trait ProgressListener: Send + Sync + 'static {
    /// Progress changed.
    fn on_progress(&self, progress: Progress);
}

impl<F> ProgressListener for F
where
    F: Fn(Progress) + Send + Sync + 'static,
{
    fn on_progress(&self, progress: Progress) {
        self(progress)
    }
}

/// Handle returned by [`ProgressRegistry::attach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(ListenerId, Arc<dyn ProgressListener>)>,
    last: Progress,
}

/// ProgressRegistry keeps the listeners of one upload session.
///
/// Listeners can be attached and detached at any time, including from
/// within a notification. Reported values never go backwards.
#[derive(Clone, Default)]
pub struct ProgressRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl ProgressRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a listener.
    pub fn attach(&self, listener: impl ProgressListener) -> ListenerId {
        let mut inner = self.inner.lock().expect("lock poisoned");
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Detach a listener, returns `false` if it was not attached.
    pub fn detach(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.lock().expect("lock poisoned");
        let before = inner.listeners.len();
        inner.listeners.retain(|(v, _)| *v != id);
        inner.listeners.len() != before
    }

    /// The latest reported progress.
    pub fn current(&self) -> Progress {
        self.inner.lock().expect("lock poisoned").last
    }

    /// Report new progress.
    ///
    /// Values lower than the latest ones are ignored, listeners only hear
    /// about changes.
    pub(crate) fn report(&self, progress: Progress) {
        let (snapshot, listeners) = {
            let mut inner = self.inner.lock().expect("lock poisoned");
            let next = Progress {
                transferred: progress.transferred.max(inner.last.transferred),
                total: progress.total.max(inner.last.total),
            };
            if next == inner.last {
                return;
            }
            inner.last = next;

            let listeners: Vec<_> = inner.listeners.iter().map(|(_, l)| l.clone()).collect();
            (next, listeners)
        };

        // Call outside the lock so listeners may attach or detach.
        for listener in listeners {
            listener.on_progress(snapshot);
        }
    }
}

impl Debug for ProgressRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().expect("lock poisoned");
        f.debug_struct("ProgressRegistry")
            .field("listeners", &inner.listeners.len())
            .field("last", &inner.last)
            .finish()
    }
}
