pub mod hygiene;
pub mod overdue;
pub mod task;
