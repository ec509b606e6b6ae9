//! Change notification for geometry under construction.

use crate::geometry::Geometry;
use crate::view::MapView;

/// Handle returned by [`GeometryMutationObserver::on_change`], used to detach the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey(u64);

type Listener = Box<dyn FnMut(&Geometry, &mut dyn MapView)>;

/// Wraps one in-progress geometry and calls every attached listener,
/// synchronously, after each change to its shape.
pub struct GeometryMutationObserver {
    geometry: Geometry,
    listeners: Vec<(ListenerKey, Listener)>,
    next_key: u64,
    revision: u64,
}

impl GeometryMutationObserver {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            listeners: Vec::new(),
            next_key: 0,
            revision: 0,
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Number of changes applied so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Attach a listener called after every change.
    pub fn on_change(
        &mut self,
        listener: impl FnMut(&Geometry, &mut dyn MapView) + 'static,
    ) -> ListenerKey {
        let key = ListenerKey(self.next_key);
        self.next_key += 1;
        self.listeners.push((key, Box::new(listener)));
        key
    }

    /// Detach a listener. Returns false if it was already detached.
    pub fn un_by_key(&mut self, key: ListenerKey) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(k, _)| *k != key);
        self.listeners.len() != before
    }

    /// Change the geometry and notify listeners before returning.
    pub fn mutate(&mut self, view: &mut dyn MapView, change: impl FnOnce(&mut Geometry)) {
        change(&mut self.geometry);
        self.revision += 1;
        let Self { geometry, listeners, .. } = self;
        for (_, listener) in listeners.iter_mut() {
            listener(&*geometry, &mut *view);
        }
    }

    /// Give up the geometry, dropping any listeners still attached.
    pub fn into_geometry(self) -> Geometry {
        self.geometry
    }
}

impl std::fmt::Debug for GeometryMutationObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeometryMutationObserver")
            .field("geometry", &self.geometry)
            .field("listeners", &self.listeners.len())
            .field("revision", &self.revision)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::RecordingView;
    use kurbo::Point;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_listener_sees_every_change() {
        let mut view = RecordingView::new();
        let mut observer = GeometryMutationObserver::new(Geometry::line(vec![Point::ZERO]));
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        observer.on_change(move |geometry, _| {
            sink.borrow_mut().push(geometry.last_coordinate());
        });

        for x in 1..=3 {
            observer.mutate(&mut view, |g| {
                if let Geometry::LineString(points) = g {
                    points.push(Point::new(x as f64, 0.0));
                }
            });
        }

        assert_eq!(
            *seen.borrow(),
            vec![
                Some(Point::new(1.0, 0.0)),
                Some(Point::new(2.0, 0.0)),
                Some(Point::new(3.0, 0.0)),
            ]
        );
        assert_eq!(observer.revision(), 3);
    }

    #[test]
    fn test_detached_listener_is_not_called() {
        let mut view = RecordingView::new();
        let mut observer = GeometryMutationObserver::new(Geometry::line(Vec::new()));
        let calls = Rc::new(RefCell::new(0));

        let counter = Rc::clone(&calls);
        let key = observer.on_change(move |_, _| *counter.borrow_mut() += 1);
        observer.mutate(&mut view, |_| {});
        assert!(observer.un_by_key(key));
        observer.mutate(&mut view, |_| {});

        assert_eq!(*calls.borrow(), 1);
        assert!(!observer.un_by_key(key));
        assert_eq!(observer.listener_count(), 0);
    }
}
