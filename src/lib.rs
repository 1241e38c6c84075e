// World model and wire parsing
pub mod world;

// Per-agent clocks
pub mod clock;

// Claim table
pub mod registry;

// Nearest-object allocation
pub mod allocator;

// Agent records and lifecycle state machine
pub mod agent;

// Performance and service counters
pub mod metrics;

// Coordination service and engine
pub mod coordinator;

// Configuration
pub mod config;

// HTTP APIs
pub mod api;
