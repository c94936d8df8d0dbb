//! In-memory model of the scenario page.
//!
//! Holds just enough of the document for the uploader: elements addressed by id,
//! their attributes and classes, registered listeners, and the markup spliced in
//! after each upload.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::{lock_or_recover, AppError, AppResult};
use crate::uploader::{Notice, Notifier, Surface};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listener {
    DragOver,
    DragLeave,
    Drop,
    Change,
    Submit,
}

#[derive(Debug, Clone, Default)]
pub struct Element {
    pub id: String,
    pub tag: String,
    attributes: BTreeMap<String, String>,
    classes: BTreeSet<String>,
    inner_html: String,
    listeners: Vec<Listener>,
}

impl Element {
    pub fn new(tag: &str, id: &str) -> Self {
        Self {
            id: id.to_string(),
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        self.attributes.insert(name.to_string(), value.to_string());
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn add_class(&mut self, class: &str) {
        self.classes.insert(class.to_string());
    }

    pub fn remove_class(&mut self, class: &str) {
        self.classes.remove(class);
    }

    pub fn inner_html(&self) -> &str {
        &self.inner_html
    }

    pub fn set_inner_html(&mut self, markup: &str) {
        self.inner_html = markup.to_string();
    }

    pub fn add_listener(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self, listener: Listener) -> usize {
        self.listeners.iter().filter(|l| **l == listener).count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Document {
    location: String,
    elements: BTreeMap<String, Element>,
    /// Ids handed to the page framework after new markup was spliced in
    processed: Vec<String>,
}

impl Document {
    pub fn new(location: &str) -> Self {
        Self {
            location: location.to_string(),
            ..Self::default()
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn insert(&mut self, element: Element) {
        self.elements.insert(element.id.clone(), element);
    }

    pub fn remove(&mut self, id: &str) -> Option<Element> {
        self.elements.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.elements.get_mut(id)
    }

    /// Only `#id` selectors are understood
    pub fn query_selector_mut(&mut self, selector: &str) -> Option<&mut Element> {
        let id = selector.trim().strip_prefix('#')?;
        self.elements.get_mut(id)
    }

    /// Page framework hook: activate behaviour inside freshly spliced markup
    pub fn process(&mut self, id: &str) {
        log::debug!("Processing new content in #{}", id);
        self.processed.push(id.to_string());
    }

    pub fn processed(&self) -> &[String] {
        &self.processed
    }
}

pub type SharedDocument = Arc<Mutex<Document>>;

/// Upload form and reconciliation target backed by a [`Document`]
#[derive(Debug, Clone)]
pub struct PageSurface {
    document: SharedDocument,
    form_id: String,
}

impl PageSurface {
    pub fn new(document: Document, form_id: &str) -> Self {
        Self {
            document: Arc::new(Mutex::new(document)),
            form_id: form_id.to_string(),
        }
    }

    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    pub fn document(&self) -> MutexGuard<'_, Document> {
        lock_or_recover(&self.document, "document access")
    }

    fn form_attribute(&self, name: &str) -> Option<String> {
        self.document()
            .get(&self.form_id)
            .and_then(|form| form.attribute(name))
            .map(str::to_string)
    }
}

impl Surface for PageSurface {
    fn action_url(&self) -> Option<String> {
        self.form_attribute("action")
    }

    fn page_path(&self) -> String {
        self.document().location().to_string()
    }

    fn update_target(&self) -> Option<String> {
        self.form_attribute("hx-target")
    }

    fn splice(&self, target: &str, markup: &str) -> AppResult<()> {
        let mut document = self.document();

        let id = match document.query_selector_mut(target) {
            Some(element) => {
                element.set_inner_html(markup);
                element.id.clone()
            }
            None => return Err(AppError::reconciliation(target)),
        };

        document.process(&id);
        Ok(())
    }
}

/// Collects notices the way the page shows them: one alert each
#[derive(Debug, Clone, Default)]
pub struct AlertLog {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl AlertLog {
    pub fn notices(&self) -> Vec<Notice> {
        lock_or_recover(&self.notices, "alert read").clone()
    }

    pub fn errors(&self) -> Vec<Notice> {
        self.notices().into_iter().filter(Notice::is_error).collect()
    }
}

impl Notifier for AlertLog {
    fn notify(&self, notice: Notice) {
        if notice.is_error() {
            log::warn!("Alert: {}", notice.detail);
        } else {
            log::info!("Notice: {}", notice.detail);
        }
        lock_or_recover(&self.notices, "alert push").push(notice);
    }
}
