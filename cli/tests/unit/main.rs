//! Unit tests that exercise the application layer and the infra adapters
//! against in-process fakes. No network access and no real `ssh`.

mod mocks;
mod ssh_session;
