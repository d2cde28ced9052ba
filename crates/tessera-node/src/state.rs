// crates/tessera-node/src/state.rs
//
// Node lifecycle state machine.
//
// Valid transitions:
//   Initializing -> Running -> Halted
//   Any state -> ShuttingDown

use std::fmt;

/// Lifecycle states of the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeState {
    /// Loading configuration, opening the store, applying genesis.
    Initializing,
    /// Producing blocks.
    Running,
    /// A block failed with a fatal error; no further blocks are produced.
    Halted,
    /// Shutting down.
    ShuttingDown,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::Initializing => write!(f, "Initializing"),
            NodeState::Running => write!(f, "Running"),
            NodeState::Halted => write!(f, "Halted"),
            NodeState::ShuttingDown => write!(f, "ShuttingDown"),
        }
    }
}

/// State machine for managing node lifecycle transitions.
pub struct NodeStateMachine {
    pub current: NodeState,
}

impl NodeStateMachine {
    /// Create a new state machine starting in the Initializing state.
    pub fn new() -> Self {
        Self {
            current: NodeState::Initializing,
        }
    }

    /// Attempt to transition to a new state.
    ///
    /// Returns an error if the transition is not valid.
    pub fn transition(&mut self, new_state: NodeState) -> Result<(), String> {
        let valid = new_state == NodeState::ShuttingDown
            || matches!(
                (&self.current, &new_state),
                (NodeState::Initializing, NodeState::Running) | (NodeState::Running, NodeState::Halted)
            );

        if valid {
            tracing::info!("State transition: {} -> {}", self.current, new_state);
            self.current = new_state;
            Ok(())
        } else {
            Err(format!(
                "Invalid state transition: {} -> {}",
                self.current, new_state
            ))
        }
    }
}

impl Default for NodeStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
