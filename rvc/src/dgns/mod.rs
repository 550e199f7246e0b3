pub mod dgn1feda;
pub mod dgn1fedb;
pub mod dgn1fef9;
pub mod dgn1ffe2;
pub mod dgn1fff6;
pub mod dgn1fff7;
pub mod message;

// Re-export commonly used types
pub use dgn1feda::DimmerStatus;
pub use dgn1fedb::DimmerCommand;
pub use dgn1fef9::ThermostatCommand;
pub use dgn1ffe2::ThermostatStatus;
pub use dgn1fff6::WaterHeaterCommand;
pub use dgn1fff7::WaterHeaterStatus;
pub use message::RvcMessage;
