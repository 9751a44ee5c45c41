pub mod states;
pub mod params;
pub mod forces;
pub mod integrator;
pub mod driver;
pub mod diagnostics;
pub mod scenario;
