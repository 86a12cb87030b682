pub mod appointments;
pub mod calendar;
pub mod clinical;
pub mod directory;
pub mod feedback;
pub mod identity;
pub mod invalidation;
pub mod messages;
pub mod policy;
pub mod reports;
pub mod scheduling;

#[cfg(test)]
pub mod testutils;
