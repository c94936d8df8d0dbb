use crate::page::{Document, Listener, PageSurface};

use super::{BatchOutcome, Notifier, SourceFile, Transport, Uploader};

pub const DROP_ZONE_ID: &str = "drop-zone";
pub const FILE_INPUT_ID: &str = "file-input";
pub const UPLOAD_FORM_ID: &str = "upload-form";

/// Marker set on the drop zone once listeners are attached
pub const INITIALIZED_ATTR: &str = "data-initialized";
pub const DRAG_OVER_CLASS: &str = "dragover";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Page has no drop zone, nothing to do
    Absent,
    /// Drop zone exists but the named companion element does not
    Degraded { missing: &'static str },
    AlreadyInitialized,
    Attached,
}

#[derive(Debug, Clone)]
pub enum PageEvent {
    DragOver,
    DragLeave,
    Drop(Vec<SourceFile>),
    FilesSelected(Vec<SourceFile>),
    Submit,
}

#[derive(Debug)]
pub enum Disposition {
    /// No listener handled the event
    Ignored,
    Styled,
    Batches(Vec<BatchOutcome>),
    SubmitSuppressed,
}

/// Wire the drop zone, file input and form, at most once per drop zone
pub fn activate(document: &mut Document) -> Activation {
    let Some(drop_zone) = document.get(DROP_ZONE_ID) else {
        return Activation::Absent;
    };

    if drop_zone.attribute(INITIALIZED_ATTR).is_some() {
        log::debug!("Drop zone already initialized, skipping");
        return Activation::AlreadyInitialized;
    }

    for required in [FILE_INPUT_ID, UPLOAD_FORM_ID] {
        if document.get(required).is_none() {
            log::warn!(
                "Drop zone present but #{} is missing, uploader not initialized",
                required
            );
            return Activation::Degraded { missing: required };
        }
    }

    if let Some(drop_zone) = document.get_mut(DROP_ZONE_ID) {
        drop_zone.add_listener(Listener::DragOver);
        drop_zone.add_listener(Listener::DragLeave);
        drop_zone.add_listener(Listener::Drop);
        drop_zone.set_attribute(INITIALIZED_ATTR, "true");
    }
    if let Some(input) = document.get_mut(FILE_INPUT_ID) {
        input.add_listener(Listener::Change);
    }
    if let Some(form) = document.get_mut(UPLOAD_FORM_ID) {
        form.add_listener(Listener::Submit);
    }

    log::info!("Uploader initialized");
    Activation::Attached
}

impl<T, N> Uploader<T, N, PageSurface>
where
    T: Transport,
    N: Notifier,
{
    /// Entry point for the initial page load
    pub fn on_page_load(&self) -> Activation {
        activate(&mut self.surface().document())
    }

    /// Entry point after the page framework swapped in new content
    pub fn on_content_swapped(&self) -> Activation {
        activate(&mut self.surface().document())
    }

    /// Route a page event through whatever listeners are registered for it
    pub async fn dispatch(&self, event: PageEvent) -> Disposition {
        match event {
            PageEvent::DragOver => self.toggle_drag_class(Listener::DragOver, true),
            PageEvent::DragLeave => self.toggle_drag_class(Listener::DragLeave, false),
            PageEvent::Drop(files) => {
                self.toggle_drag_class(Listener::Drop, false);
                let listeners = self.listener_count(DROP_ZONE_ID, Listener::Drop);
                self.run_listeners(listeners, files).await
            }
            PageEvent::FilesSelected(files) => {
                let listeners = self.listener_count(FILE_INPUT_ID, Listener::Change);
                self.run_listeners(listeners, files).await
            }
            PageEvent::Submit => {
                if self.listener_count(UPLOAD_FORM_ID, Listener::Submit) > 0 {
                    log::debug!("Native form submission suppressed");
                    Disposition::SubmitSuppressed
                } else {
                    Disposition::Ignored
                }
            }
        }
    }

    fn listener_count(&self, id: &str, listener: Listener) -> usize {
        self.surface()
            .document()
            .get(id)
            .map(|element| element.listener_count(listener))
            .unwrap_or(0)
    }

    fn toggle_drag_class(&self, listener: Listener, on: bool) -> Disposition {
        let mut document = self.surface().document();

        let Some(drop_zone) = document.get_mut(DROP_ZONE_ID) else {
            return Disposition::Ignored;
        };
        if drop_zone.listener_count(listener) == 0 {
            return Disposition::Ignored;
        }

        if on {
            drop_zone.add_class(DRAG_OVER_CLASS);
        } else {
            drop_zone.remove_class(DRAG_OVER_CLASS);
        }
        Disposition::Styled
    }

    async fn run_listeners(&self, listeners: usize, files: Vec<SourceFile>) -> Disposition {
        if listeners == 0 {
            return Disposition::Ignored;
        }

        let mut outcomes = Vec::with_capacity(listeners);
        for _ in 0..listeners {
            outcomes.push(self.handle_batch(files.clone()).await);
        }
        Disposition::Batches(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Element;

    fn full_page() -> Document {
        let mut doc = Document::new("/study/1/scenario/1");
        doc.insert(Element::new("div", DROP_ZONE_ID));
        doc.insert(Element::new("input", FILE_INPUT_ID));
        doc.insert(Element::new("form", UPLOAD_FORM_ID));
        doc
    }

    #[test]
    fn test_activation_without_drop_zone_is_silent() {
        let mut doc = Document::new("/");
        doc.insert(Element::new("form", UPLOAD_FORM_ID));
        assert_eq!(activate(&mut doc), Activation::Absent);
    }

    #[test]
    fn test_activation_degraded() {
        let mut doc = full_page();
        doc.remove(FILE_INPUT_ID);
        assert_eq!(
            activate(&mut doc),
            Activation::Degraded {
                missing: FILE_INPUT_ID
            }
        );
        assert!(doc.get(DROP_ZONE_ID).unwrap().attribute(INITIALIZED_ATTR).is_none());
        assert_eq!(
            doc.get(DROP_ZONE_ID).unwrap().listener_count(Listener::Drop),
            0
        );

        let mut doc = full_page();
        doc.remove(UPLOAD_FORM_ID);
        assert_eq!(
            activate(&mut doc),
            Activation::Degraded {
                missing: UPLOAD_FORM_ID
            }
        );
    }

    #[test]
    fn test_activation_is_idempotent() {
        let mut doc = full_page();
        assert_eq!(activate(&mut doc), Activation::Attached);
        assert_eq!(activate(&mut doc), Activation::AlreadyInitialized);

        let drop_zone = doc.get(DROP_ZONE_ID).unwrap();
        assert_eq!(drop_zone.listener_count(Listener::Drop), 1);
        assert_eq!(drop_zone.attribute(INITIALIZED_ATTR), Some("true"));
        assert_eq!(
            doc.get(FILE_INPUT_ID).unwrap().listener_count(Listener::Change),
            1
        );
        assert_eq!(
            doc.get(UPLOAD_FORM_ID).unwrap().listener_count(Listener::Submit),
            1
        );
    }
}
