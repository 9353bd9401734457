pub mod bazaar_adapter;
#[cfg(test)]
pub mod fake_runner;
pub mod mercurial_adapter;
pub mod process_runner;
pub mod svn_property;

pub use bazaar_adapter::BazaarAdapter;
pub use mercurial_adapter::MercurialAdapter;
pub use process_runner::ProcessRunner;
