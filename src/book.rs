// 📒 Subscription Book - the in-memory collection and its change discipline
//
// Every mutation runs the same three steps, in order:
//   1. mutate the in-memory collection
//   2. persist through the store (best-effort: failures are logged, not returned)
//   3. notify observers with a `Change`
//
// Nothing is persisted implicitly. Readers get slices and computed summaries;
// only the book mutates the collection.

use serde::Serialize;

use crate::aggregator::Summary;
use crate::backup::{merge_by_id, BackupDocument, MergeReport};
use crate::error::BookError;
use crate::settings::{Settings, Theme};
use crate::storage::SubscriptionStore;
use crate::subscription::{Subscription, SubscriptionForm};

/// What a mutation did, as seen by observers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    Added { id: String },
    Updated { id: String },
    Removed { id: String },
    Imported { updated: usize, added: usize },
    ThemeChanged { theme: Theme },
}

pub type Observer = Box<dyn FnMut(&Change) + Send>;

pub struct SubscriptionBook<S: SubscriptionStore> {
    subscriptions: Vec<Subscription>,
    settings: Settings,
    store: S,
    observers: Vec<Observer>,
}

impl<S: SubscriptionStore> SubscriptionBook<S> {
    /// Load the collection and settings once from `store`
    pub fn open(store: S) -> Self {
        let subscriptions = store.load();
        let settings = store.load_settings();
        tracing::info!(
            count = subscriptions.len(),
            theme = %settings.selected_theme,
            "loaded subscription book"
        );

        SubscriptionBook {
            subscriptions,
            settings,
            store,
            observers: Vec::new(),
        }
    }

    // ========================================================================
    // READ
    // ========================================================================

    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    pub fn get(&self, id: &str) -> Option<&Subscription> {
        self.subscriptions.iter().find(|sub| sub.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.subscriptions.iter().position(|sub| sub.id == id)
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn summary(&self) -> Summary {
        Summary::of(&self.subscriptions)
    }

    pub fn export(&self) -> BackupDocument {
        BackupDocument::new(self.subscriptions.clone(), &self.settings)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ========================================================================
    // OBSERVERS
    // ========================================================================

    pub fn subscribe(&mut self, observer: Observer) {
        self.observers.push(observer);
    }

    fn notify(&mut self, change: Change) {
        tracing::debug!(?change, "subscription book changed");
        for observer in self.observers.iter_mut() {
            observer(&change);
        }
    }

    // ========================================================================
    // MUTATIONS (mutate → persist → notify)
    // ========================================================================

    /// Add a subscription from the add form. The stored date is one cycle
    /// after the entered date.
    pub fn add(&mut self, form: &SubscriptionForm) -> Result<&Subscription, BookError> {
        let subscription = form.create()?;
        let id = subscription.id.clone();
        self.subscriptions.push(subscription);

        self.persist_subscriptions();
        self.notify(Change::Added { id });

        let last = self.subscriptions.len() - 1;
        Ok(&self.subscriptions[last])
    }

    /// Replace every value of subscription `id` with the form's, keeping its
    /// identity and position. The entered date is stored as-is.
    pub fn update(
        &mut self,
        id: &str,
        form: &SubscriptionForm,
    ) -> Result<&Subscription, BookError> {
        let index = self
            .position(id)
            .ok_or_else(|| BookError::NotFound(id.to_string()))?;
        let values = form.validate()?;
        self.subscriptions[index].apply(values);

        self.persist_subscriptions();
        self.notify(Change::Updated { id: id.to_string() });

        Ok(&self.subscriptions[index])
    }

    pub fn remove(&mut self, id: &str) -> Result<Subscription, BookError> {
        let index = self
            .position(id)
            .ok_or_else(|| BookError::NotFound(id.to_string()))?;
        self.remove_at(index)
    }

    /// Remove by display position
    pub fn remove_at(&mut self, index: usize) -> Result<Subscription, BookError> {
        if index >= self.subscriptions.len() {
            return Err(BookError::NotFound(format!("position {}", index)));
        }
        let removed = self.subscriptions.remove(index);

        self.persist_subscriptions();
        self.notify(Change::Removed {
            id: removed.id.clone(),
        });

        Ok(removed)
    }

    /// Merge a backup into the book. A theme in the backup replaces the current one.
    pub fn import(&mut self, document: BackupDocument) -> MergeReport {
        let (merged, report) = merge_by_id(&self.subscriptions, &document.subscriptions);
        self.subscriptions = merged;
        self.persist_subscriptions();

        if let Some(theme) = document.selected_theme {
            self.apply_theme(theme);
        }

        tracing::info!(
            updated = report.updated,
            added = report.added,
            "imported backup"
        );
        self.notify(Change::Imported {
            updated: report.updated,
            added: report.added,
        });

        report
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.apply_theme(theme);
    }

    fn apply_theme(&mut self, theme: Theme) {
        if self.settings.selected_theme == theme {
            return;
        }
        self.settings.selected_theme = theme;

        if let Err(e) = self.store.save_settings(&self.settings) {
            tracing::error!(error = %e, "failed to persist settings");
        }
        self.notify(Change::ThemeChanged { theme });
    }

    fn persist_subscriptions(&mut self) {
        if let Err(e) = self.store.save(&self.subscriptions) {
            tracing::error!(
                error = %e,
                count = self.subscriptions.len(),
                "failed to persist subscriptions"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::subscription::Frequency;
    use chrono::NaiveDate;
    use std::sync::{Arc, Mutex};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn form(name: &str, amount: &str, frequency: Frequency) -> SubscriptionForm {
        SubscriptionForm::new(name, amount, "2025-01-15", frequency)
    }

    fn recording(book: &mut SubscriptionBook<MemoryStore>) -> Arc<Mutex<Vec<Change>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        book.subscribe(Box::new(move |change| {
            sink.lock().unwrap().push(change.clone());
        }));
        seen
    }

    #[test]
    fn test_add_advances_date_persists_and_notifies() {
        let mut book = SubscriptionBook::open(MemoryStore::new());
        let seen = recording(&mut book);

        let id = book
            .add(&form("Netflix", "15.49", Frequency::Monthly))
            .unwrap()
            .id
            .clone();

        assert_eq!(book.len(), 1);
        assert_eq!(book.get(&id).unwrap().date, date(2025, 2, 15));
        assert_eq!(book.store().save_count(), 1);
        assert_eq!(book.store().load(), book.subscriptions());
        assert_eq!(*seen.lock().unwrap(), vec![Change::Added { id }]);
    }

    #[test]
    fn test_invalid_form_leaves_book_and_store_untouched() {
        let mut book = SubscriptionBook::open(MemoryStore::new());
        let seen = recording(&mut book);

        let result = book.add(&form("Broken", "twelve", Frequency::Monthly));

        assert!(matches!(result, Err(BookError::Form(_))));
        assert!(book.is_empty());
        assert_eq!(book.store().save_count(), 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_update_keeps_identity_position_and_entered_date() {
        let mut book = SubscriptionBook::open(MemoryStore::new());
        book.add(&form("A", "1", Frequency::Monthly)).unwrap();
        let id = book.add(&form("B", "2", Frequency::Monthly)).unwrap().id.clone();
        book.add(&form("C", "3", Frequency::Monthly)).unwrap();

        let edit = SubscriptionForm::new("B+", "4.5", "2025-03-01", Frequency::Weekly);
        book.update(&id, &edit).unwrap();

        assert_eq!(book.position(&id), Some(1));
        let updated = book.get(&id).unwrap();
        assert_eq!(updated.name, "B+");
        assert_eq!(updated.amount, 4.5);
        assert_eq!(updated.date, date(2025, 3, 1));
        assert_eq!(updated.frequency, Frequency::Weekly);
        assert_eq!(book.store().save_count(), 4);
    }

    #[test]
    fn test_update_unknown_id_is_not_found() {
        let mut book = SubscriptionBook::open(MemoryStore::new());
        let result = book.update("nope", &form("X", "1", Frequency::Monthly));
        assert_eq!(result.unwrap_err(), BookError::NotFound("nope".to_string()));
    }

    #[test]
    fn test_update_with_invalid_amount_is_rejected() {
        let mut book = SubscriptionBook::open(MemoryStore::new());
        let id = book.add(&form("A", "1", Frequency::Monthly)).unwrap().id.clone();

        assert!(book.update(&id, &form("A", "-2", Frequency::Monthly)).is_err());
        assert_eq!(book.get(&id).unwrap().amount, 1.0);
        assert_eq!(book.store().save_count(), 1);
    }

    #[test]
    fn test_remove_by_id_and_position() {
        let mut book = SubscriptionBook::open(MemoryStore::new());
        let first = book.add(&form("A", "1", Frequency::Monthly)).unwrap().id.clone();
        book.add(&form("B", "2", Frequency::Monthly)).unwrap();
        let seen = recording(&mut book);

        let removed = book.remove(&first).unwrap();
        assert_eq!(removed.name, "A");
        assert_eq!(book.len(), 1);

        assert!(book.remove_at(5).is_err());
        let removed = book.remove_at(0).unwrap();
        assert_eq!(removed.name, "B");
        assert!(book.is_empty());
        assert!(book.store().load().is_empty());
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_summary_recomputes_after_each_mutation() {
        let mut book = SubscriptionBook::open(MemoryStore::new());
        assert_eq!(book.summary().monthly_total, 0.0);

        let id = book.add(&form("A", "10", Frequency::Monthly)).unwrap().id.clone();
        book.add(&form("B", "120", Frequency::Yearly)).unwrap();
        assert_eq!(book.summary().monthly_total, 10.0);
        assert_eq!(book.summary().yearly_total, 240.0);

        book.remove(&id).unwrap();
        assert_eq!(book.summary().monthly_total, 0.0);
        assert_eq!(book.summary().yearly_total, 120.0);
        assert_eq!(book.summary().count, 1);
    }

    #[test]
    fn test_open_loads_previous_state() {
        let mut store = MemoryStore::new();
        let sub = Subscription::new("Kept".to_string(), 3.0, date(2025, 5, 1), Frequency::Biweekly);
        store.save(&[sub.clone()]).unwrap();
        store.save_settings(&Settings::with_theme(Theme::Light)).unwrap();

        let book = SubscriptionBook::open(store);
        assert_eq!(book.subscriptions(), &[sub]);
        assert_eq!(book.settings().selected_theme, Theme::Light);
    }

    #[test]
    fn test_open_with_malformed_store_starts_empty() {
        let book = SubscriptionBook::open(MemoryStore::with_raw("{\"broken\":"));
        assert!(book.is_empty());
    }

    #[test]
    fn test_failed_save_is_not_propagated() {
        let mut book = SubscriptionBook::open(MemoryStore::failing());
        let seen = recording(&mut book);

        assert!(book.add(&form("A", "1", Frequency::Monthly)).is_ok());
        assert_eq!(book.len(), 1);
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(book.store().raw_subscriptions().is_none());
    }

    #[test]
    fn test_import_merges_by_id_and_applies_theme() {
        let mut store = MemoryStore::new();
        let existing = Subscription::with_id(
            "1".to_string(),
            "One".to_string(),
            10.0,
            date(2025, 1, 1),
            Frequency::Monthly,
        );
        store.save(&[existing]).unwrap();
        let mut book = SubscriptionBook::open(store);
        let seen = recording(&mut book);

        let monthly = |id: &str, name: &str, amount: f64| {
            Subscription::with_id(
                id.to_string(),
                name.to_string(),
                amount,
                date(2025, 1, 1),
                Frequency::Monthly,
            )
        };
        let document = BackupDocument {
            subscriptions: vec![monthly("1", "One", 20.0), monthly("2", "Two", 5.0)],
            selected_theme: Some(Theme::Dark),
        };
        let report = book.import(document);

        assert_eq!(report, MergeReport { updated: 1, added: 1 });
        let ids: Vec<(&str, f64)> = book
            .subscriptions()
            .iter()
            .map(|s| (s.id.as_str(), s.amount))
            .collect();
        assert_eq!(ids, vec![("1", 20.0), ("2", 5.0)]);
        assert_eq!(book.settings().selected_theme, Theme::Dark);
        assert_eq!(book.store().load_settings().selected_theme, Theme::Dark);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                Change::ThemeChanged { theme: Theme::Dark },
                Change::Imported { updated: 1, added: 1 },
            ]
        );
    }

    #[test]
    fn test_import_of_undecodable_backup_changes_nothing() {
        let mut book = SubscriptionBook::open(MemoryStore::new());
        book.add(&form("A", "1", Frequency::Monthly)).unwrap();
        book.set_theme(Theme::Light);

        let report = book.import(BackupDocument::from_json_or_empty("garbage"));

        assert_eq!(report, MergeReport::default());
        assert_eq!(book.len(), 1);
        assert_eq!(book.settings().selected_theme, Theme::Light);
    }

    #[test]
    fn test_set_theme_same_value_is_quiet() {
        let mut book = SubscriptionBook::open(MemoryStore::new());
        let seen = recording(&mut book);

        book.set_theme(Theme::System);
        assert!(seen.lock().unwrap().is_empty());

        book.set_theme(Theme::Dark);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Change::ThemeChanged { theme: Theme::Dark }]
        );
    }

    #[test]
    fn test_export_reflects_book() {
        let mut book = SubscriptionBook::open(MemoryStore::new());
        book.add(&form("A", "1", Frequency::Weekly)).unwrap();
        book.set_theme(Theme::Dark);

        let doc = book.export();
        assert_eq!(doc.subscriptions, book.subscriptions());
        assert_eq!(doc.selected_theme, Some(Theme::Dark));
    }
}
