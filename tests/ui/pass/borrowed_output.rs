use tagged_ref::{dispatch, TaggedRef};
use tagged_ref_macros::{tagged_ref, visitor};

struct Rock(u8);
struct Paper(u8);

#[tagged_ref]
enum HandRef {
    Rock,
    Paper,
}

struct Weight;

#[visitor]
impl Weight {
    fn visit(rock: &Rock) -> &u8 {
        &rock.0
    }

    fn visit(paper: &Paper) -> &u8 {
        &paper.0
    }
}

struct Label {
    name: String,
}

#[visitor]
impl Label {
    fn visit(&self, _: &Rock, _: &Paper) -> &str {
        &self.name
    }

    #[fallback]
    fn visit<A, B>(&self, _: &A, _: &B) -> &str {
        ""
    }
}

fn main() {
    let (rock, paper) = (Rock(3), Paper(1));
    let weight = HandRef::new(&rock).visit(Weight);
    assert!(std::ptr::eq(weight, &rock.0));
    assert_eq!(*HandRef::new(&paper).visit(Weight), 1);

    let label = Label {
        name: "rock on paper".to_owned(),
    };
    let (r, p) = (HandRef::new(&rock), HandRef::new(&paper));
    assert_eq!(dispatch(&label, (r, p)), "rock on paper");
    assert_eq!(dispatch(&label, (p, r)), "");
}
