pub(crate) mod definition;
pub(crate) mod exam_backend;
pub(crate) mod submission_finalize;
pub(crate) mod work_timing;
