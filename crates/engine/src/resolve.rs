//! Contact identity resolution.
//!
//! Derives a best-effort phone/email identity for an attendee. Payload hints
//! are consulted first; the external records store is only queried when an
//! email or phone predicate exists, and the secondary phone-by-email lookup
//! runs only after the payload hints are exhausted.

use std::future::Future;

use relay_common::error::RelayError;
use relay_common::types::ContactIdentity;

use crate::phone;

/// Read access to the external records store.
///
/// Implementations combine email-equality and phone-equality predicates with
/// logical OR when both are given. Result ranking is the store's own return
/// order; callers take the first match.
pub trait RecordsStore: Send + Sync + 'static {
    /// Find a record id by email and/or query-form phone.
    fn find_record(
        &self,
        email: Option<&str>,
        phone_query: Option<&str>,
    ) -> impl Future<Output = Result<Option<String>, RelayError>> + Send;

    /// Look up the stored phone field of the record matching `email`.
    fn phone_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<String>, RelayError>> + Send;

    /// Write back the formatted schedule timestamp onto a record.
    fn update_schedule(
        &self,
        record_id: &str,
        formatted: &str,
    ) -> impl Future<Output = Result<(), RelayError>> + Send;
}

/// Resolves attendee contact identities against a records store.
pub struct ContactResolver<'a, R: RecordsStore> {
    store: &'a R,
    country_code: &'a str,
}

impl<'a, R: RecordsStore> ContactResolver<'a, R> {
    pub fn new(store: &'a R, country_code: &'a str) -> Self {
        Self {
            store,
            country_code,
        }
    }

    /// Resolve a contact identity from an optional email and the ordered
    /// payload hints.
    ///
    /// With neither email nor hints, resolution short-circuits to an empty
    /// identity without touching the store — some meetings simply have no
    /// reachable contact, and that is a valid terminal state.
    pub async fn resolve(
        &self,
        email: Option<&str>,
        hints: &[String],
    ) -> Result<ContactIdentity, RelayError> {
        let hint_phone = hints
            .iter()
            .map(|h| phone::to_query_form(h, self.country_code))
            .find(|p| !p.is_empty());

        if email.is_none() && hint_phone.is_none() {
            tracing::debug!("no email and no payload hints; skipping records lookup");
            return Ok(ContactIdentity::default());
        }

        // First result in store order wins. Arbitrary but documented.
        let record_id = self
            .store
            .find_record(email, hint_phone.as_deref())
            .await?;

        let phone = match hint_phone {
            Some(p) => Some(p),
            // Secondary path: payload hints exhausted, recover the phone
            // from the record matched by email.
            None => match email {
                Some(email) => self
                    .store
                    .phone_by_email(email)
                    .await?
                    .map(|p| phone::to_query_form(&p, self.country_code)),
                None => None,
            },
        };

        Ok(ContactIdentity {
            email: email.map(str::to_string),
            phone,
            record_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Fake store that records every call it receives.
    #[derive(Default)]
    struct FakeStore {
        record: Option<String>,
        stored_phone: Option<String>,
        find_calls: Mutex<Vec<(Option<String>, Option<String>)>>,
        phone_calls: Mutex<Vec<String>>,
    }

    impl RecordsStore for FakeStore {
        async fn find_record(
            &self,
            email: Option<&str>,
            phone_query: Option<&str>,
        ) -> Result<Option<String>, RelayError> {
            self.find_calls.lock().unwrap().push((
                email.map(str::to_string),
                phone_query.map(str::to_string),
            ));
            Ok(self.record.clone())
        }

        async fn phone_by_email(&self, email: &str) -> Result<Option<String>, RelayError> {
            self.phone_calls.lock().unwrap().push(email.to_string());
            Ok(self.stored_phone.clone())
        }

        async fn update_schedule(&self, _: &str, _: &str) -> Result<(), RelayError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_no_identity_short_circuits_without_store_calls() {
        let store = FakeStore::default();
        let resolver = ContactResolver::new(&store, "55");

        let identity = resolver.resolve(None, &[]).await.unwrap();

        assert!(identity.is_empty());
        assert!(store.find_calls.lock().unwrap().is_empty());
        assert!(store.phone_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hint_phone_queried_in_query_form() {
        let store = FakeStore {
            record: Some("rec_1".to_string()),
            ..Default::default()
        };
        let resolver = ContactResolver::new(&store, "55");

        let hints = vec!["+55 11 91234-5678".to_string()];
        let identity = resolver
            .resolve(Some("maria@example.com"), &hints)
            .await
            .unwrap();

        let calls = store.find_calls.lock().unwrap();
        assert_eq!(
            calls[0],
            (
                Some("maria@example.com".to_string()),
                Some("11912345678".to_string())
            )
        );
        assert_eq!(identity.record_id.as_deref(), Some("rec_1"));
        assert_eq!(identity.phone.as_deref(), Some("11912345678"));
        // Primary hints sufficed; no secondary lookup.
        assert!(store.phone_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_secondary_lookup_only_when_hints_exhausted() {
        let store = FakeStore {
            record: Some("rec_2".to_string()),
            stored_phone: Some("11 98888-7777".to_string()),
            ..Default::default()
        };
        let resolver = ContactResolver::new(&store, "55");

        let identity = resolver
            .resolve(Some("joao@example.com"), &[])
            .await
            .unwrap();

        assert_eq!(
            store.phone_calls.lock().unwrap().as_slice(),
            &["joao@example.com".to_string()]
        );
        assert_eq!(identity.phone.as_deref(), Some("11988887777"));
        assert_eq!(identity.record_id.as_deref(), Some("rec_2"));
    }

    #[tokio::test]
    async fn test_phone_only_resolution() {
        let store = FakeStore::default();
        let resolver = ContactResolver::new(&store, "55");

        let hints = vec!["5511912345678".to_string()];
        let identity = resolver.resolve(None, &hints).await.unwrap();

        let calls = store.find_calls.lock().unwrap();
        assert_eq!(calls[0], (None, Some("11912345678".to_string())));
        assert_eq!(identity.phone.as_deref(), Some("11912345678"));
        assert!(identity.record_id.is_none());
        // No email → the secondary path cannot run.
        assert!(store.phone_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_match_still_keeps_hint_phone() {
        let store = FakeStore::default();
        let resolver = ContactResolver::new(&store, "55");

        let hints = vec!["+55 21 90000-0000".to_string()];
        let identity = resolver
            .resolve(Some("x@example.com"), &hints)
            .await
            .unwrap();

        assert!(identity.record_id.is_none());
        assert_eq!(identity.phone.as_deref(), Some("21900000000"));
        assert_eq!(identity.email.as_deref(), Some("x@example.com"));
    }
}
