//! The offline worker: install, activate, intercept

pub mod install;
pub mod intercept;
pub mod lifecycle;

pub use install::{
    ActivationReport, InstallReport, InstallationController, PopulateOutcome,
    DEFAULT_INSTALL_CONCURRENCY,
};
pub use intercept::{decide, Action, Handled, Intercepted, Interceptor, ResponseSource};
pub use lifecycle::{
    ClientId, ClientSet, ControlMessage, RegisterOutcome, Registration, RegistrationRecord,
    WorkerState,
};
