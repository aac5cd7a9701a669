use std::marker::PhantomData;

use tagged_ref::{dispatch, TaggedRef};
use tagged_ref_macros::{tagged_ref, visitor};

struct Circle;
struct Square;

#[tagged_ref]
enum ShapeRef {
    Circle,
    Square,
}

struct Collect<'v, T> {
    seen: &'v mut Vec<&'static str>,
    marker: PhantomData<T>,
}

#[visitor]
impl<'v, T> Collect<'v, T> {
    fn push(&mut self, _: &Circle, label: &'static str) -> usize {
        self.seen.push(label);
        self.seen.len()
    }

    fn push(&mut self, _: &Square, label: &'static str) -> usize {
        self.seen.push(label);
        self.seen.len()
    }
}

struct Pair;

#[visitor]
impl Pair {
    fn visit<'x>(self, _: &'x Circle, _: &'x Circle) -> u8 {
        1
    }

    #[fallback]
    fn visit<A: ?Sized, B>(self, _: &A, _: &B) -> u8 {
        0
    }
}

fn main() {
    let mut seen = Vec::new();
    let mut collect = Collect::<u8> {
        seen: &mut seen,
        marker: PhantomData,
    };
    let circle = Circle;
    let square = Square;
    assert_eq!(ShapeRef::new(&circle).visit_with(&mut collect, ("c",)), 1);
    assert_eq!(ShapeRef::new(&square).visit_with(&mut collect, ("s",)), 2);
    assert_eq!(seen, ["c", "s"]);

    let (c, s) = (ShapeRef::new(&circle), ShapeRef::new(&square));
    assert_eq!(dispatch(Pair, (c, c)), 1);
    assert_eq!(dispatch(Pair, (c, s)), 0);
}
