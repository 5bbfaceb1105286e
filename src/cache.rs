use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::templates_structs::PublicFormResponse;

/// Cached public view of one form together with its validator.
#[derive(Debug)]
pub struct CachedForm {
    pub body: PublicFormResponse,
    pub etag: String,
}

/// Short-lived cache for public form reads. Writes to a form must call
/// `invalidate` so the next read goes back to the database.
#[derive(Clone)]
pub struct FormCache {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<Uuid, (Instant, Arc<CachedForm>)>>>,
}

impl FormCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Fresh entry for `form_id`, if any. Stale entries are dropped on the way.
    pub fn get(&self, form_id: Uuid) -> Option<Arc<CachedForm>> {
        let mut map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match map.get(&form_id) {
            Some((stored_at, entry)) if stored_at.elapsed() < self.ttl => Some(entry.clone()),
            Some(_) => {
                map.remove(&form_id);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, form_id: Uuid, entry: CachedForm) -> Arc<CachedForm> {
        let entry = Arc::new(entry);
        if !self.ttl.is_zero() {
            let mut map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            map.insert(form_id, (Instant::now(), entry.clone()));
        }
        entry
    }

    pub fn invalidate(&self, form_id: Uuid) {
        let mut map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(&form_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::form::{FormSettings, PublicForm, compute_theme_tokens};

    fn entry(id: Uuid) -> CachedForm {
        let settings = FormSettings::default();
        CachedForm {
            body: PublicFormResponse {
                theme: compute_theme_tokens(id, &settings),
                form: PublicForm {
                    id,
                    name: "Contact".into(),
                    description: String::new(),
                    fields: vec![],
                    settings,
                },
            },
            etag: format!("\"form-{id}\""),
        }
    }

    #[test]
    fn hit_then_invalidate() {
        let cache = FormCache::new(Duration::from_secs(60));
        let id = Uuid::new_v4();
        assert!(cache.get(id).is_none());
        cache.insert(id, entry(id));
        assert_eq!(cache.get(id).unwrap().body.form.name, "Contact");
        cache.invalidate(id);
        assert!(cache.get(id).is_none());
    }

    #[test]
    fn zero_ttl_never_stores() {
        let cache = FormCache::new(Duration::ZERO);
        let id = Uuid::new_v4();
        let stored = cache.insert(id, entry(id));
        assert_eq!(stored.etag, format!("\"form-{id}\""));
        assert!(cache.get(id).is_none());
    }
}
