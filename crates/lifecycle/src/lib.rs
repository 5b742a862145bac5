//! Account lifecycle workers — trial expiry, payment renewal reminders,
//! and the data purge that ends the retention window.

pub mod notify;
pub mod payment;
pub mod purge;
pub mod trial;

pub use notify::{capture_notifier, CaptureNotifier, LogNotifier, RenewalNotice, RenewalNotifier};
pub use payment::PaymentRenewalWorker;
pub use purge::TenantResources;
pub use trial::TrialLifecycleWorker;
