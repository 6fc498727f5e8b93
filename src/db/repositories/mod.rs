mod labels;
mod work_sessions;
