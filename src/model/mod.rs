pub mod action;
pub mod screen;
pub mod ui_tree;
