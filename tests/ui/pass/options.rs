use tagged_ref::TaggedRef;
use tagged_ref_macros::tagged_ref;

mod shapes {
    pub struct Circle;
    pub struct Square;
}

use shapes::{Circle, Square};

#[tagged_ref(tag = "ShapeKind", no_impl = false, dynamic = false)]
#[derive(Clone, Copy)]
pub enum ShapeRef<'s> {
    Round(&'s Circle),
    Boxy(shapes::Square),
}

fn main() {
    let square = Square;
    let shape = ShapeRef::from(&square);
    assert_eq!(shape.tag(), ShapeKind::Boxy);
    assert_eq!(ShapeRef::CATALOGUE, &["Circle", "shapes::Square"]);
    let _: Option<&Circle> = shape.get();
}
