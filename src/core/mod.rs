pub mod functions;
pub mod modifiers;
pub mod nodes;
pub mod processors;
