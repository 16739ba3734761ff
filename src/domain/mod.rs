pub mod advertise;
pub mod commitment;
pub mod exchange;
pub mod model;
pub mod pricing;
pub mod publish;
pub mod retrieval;
