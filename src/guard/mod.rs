pub mod loop_guard;
