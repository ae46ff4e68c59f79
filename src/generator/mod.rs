pub mod context;
pub mod outlet;
pub mod research;
pub mod step_forward_agent;
pub mod workflow;
