pub mod db_init;

pub mod alert_evaluator;
pub mod change_feed;
pub mod dispatcher;
pub mod trigger_executor;
