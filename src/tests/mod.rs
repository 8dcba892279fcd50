use crate::SID;

mod binary;
mod conditional;
mod sddl;
mod sid;
mod sort;

fn sid(s: &str) -> SID {
    s.parse().unwrap()
}

fn domain() -> SID {
    sid("S-1-5-21-1004336348-1177238915-682003330")
}
