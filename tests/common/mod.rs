#[cfg(test)]
mod fixture;
pub use fixture::Fixture;

#[cfg(test)]
mod plinkqc_runner;
pub use plinkqc_runner::PlinkqcRunner;
