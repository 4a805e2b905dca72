pub mod screen_store;
