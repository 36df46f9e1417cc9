pub mod gateway;

pub use gateway::{DatabaseGateway, GatewayError, NAME_COLLISION_MARKER};

#[cfg(test)]
pub use gateway::MockDatabaseGateway;
