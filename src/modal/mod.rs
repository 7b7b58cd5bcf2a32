//! Lets an open modal claim the next back gesture.
//!
//! Modals register when they open and unregister when they close. Only the
//! most recently registered interceptor is consulted, and it is consumed by
//! the intercept so its callback fires exactly once.

pub type ModalId = String;

pub type InterceptCallback = Box<dyn FnMut() + Send>;

struct Interceptor {
    id: ModalId,
    on_intercept: InterceptCallback,
}

#[derive(Default)]
pub struct ModalInterceptionBridge {
    interceptors: Vec<Interceptor>,
}

impl ModalInterceptionBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id`. Re-registering an id moves it to the top.
    pub fn register(&mut self, id: impl Into<ModalId>, on_intercept: InterceptCallback) {
        let id = id.into();
        self.interceptors.retain(|interceptor| interceptor.id != id);
        self.interceptors.push(Interceptor { id, on_intercept });
    }

    /// Returns false when `id` was not registered.
    pub fn unregister(&mut self, id: &str) -> bool {
        let before = self.interceptors.len();
        self.interceptors.retain(|interceptor| interceptor.id != id);
        self.interceptors.len() != before
    }

    pub fn active_id(&self) -> Option<&str> {
        self.interceptors.last().map(|interceptor| interceptor.id.as_str())
    }

    pub fn is_active(&self) -> bool {
        !self.interceptors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Remove the active interceptor and run its callback.
    pub fn intercept(&mut self) -> Option<ModalId> {
        let mut interceptor = self.interceptors.pop()?;
        (interceptor.on_intercept)();
        Some(interceptor.id)
    }
}

impl std::fmt::Debug for ModalInterceptionBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self
            .interceptors
            .iter()
            .map(|interceptor| interceptor.id.as_str())
            .collect();
        f.debug_struct("ModalInterceptionBridge")
            .field("interceptors", &ids)
            .finish()
    }
}
