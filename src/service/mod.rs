pub mod availability;
pub mod calendar_service;
pub mod event_writer;
pub mod openai_service;
pub mod plan_flow;
pub mod plan_reconciler;
