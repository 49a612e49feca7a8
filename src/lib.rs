//! # DQN Tic-Tac-Toe
//!
//! A tic-tac-toe agent trained by self-play with Double DQN, using the Burn
//! ML framework on the CPU.
//!
//! ## Modules
//!
//! - [`game`]: Core game logic: board, player, state machine
//! - [`ai`]: Agent trait, epsilon-greedy policy, Q-network, DQN agent
//! - [`training`]: Self-play driver, replay buffer, interactive session, trainer
//! - [`checkpoint`]: Single-file agent persistence
//! - [`config`]: TOML configuration loading and validation
//! - [`error`]: Structured error types

#![recursion_limit = "256"]

pub mod ai;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod game;
pub mod training;
