use std::fmt::Debug;

use tagged_ref::{dispatch, TaggedRef};
use tagged_ref_macros::{tagged_ref, visitor};

#[derive(Debug)]
struct Rock;
#[derive(Debug)]
struct Paper(&'static str);

#[tagged_ref]
enum HandRef {
    Rock,
    Paper,
}

struct Show;

#[visitor]
impl Show {
    fn visit(_: &Rock, _: &Rock) -> String {
        "two rocks".to_owned()
    }

    #[fallback]
    fn visit<A: Debug, B>(a: &A, b: &B) -> String
    where
        B: Debug + ?Sized,
    {
        format!("{a:?} vs {b:?}")
    }
}

struct Repeat;

#[visitor]
impl Repeat {
    #[fallback]
    fn visit<A: Debug>(hand: A, times: usize) -> String {
        format!("{hand:?}").repeat(times)
    }
}

fn main() {
    let (rock, paper) = (Rock, Paper("thin"));
    let (r, p) = (HandRef::new(&rock), HandRef::new(&paper));

    assert_eq!(dispatch(Show, (r, r)), "two rocks");
    assert_eq!(dispatch(Show, (r, p)), r#"Rock vs Paper("thin")"#);
    assert_eq!(p.visit_with(Repeat, (2usize,)), r#"Paper("thin")Paper("thin")"#);
}
