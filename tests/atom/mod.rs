mod event_loop;
mod profile_flow;
