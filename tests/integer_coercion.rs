//! Width-narrowing integer coercion: `Constant::fits_integer_width` and
//! `Coercer::fold_constant` must agree on what fits.

use hilta::ast::constant::Constant;
use hilta::ast::ty::Type;
use hilta::ast::arena::Arena;
use hilta::operator::Coercer;

#[test]
fn signed_width_bounds_are_checked_per_width() {
    assert!(Constant::fits_integer_width(127, 8, true));
    assert!(!Constant::fits_integer_width(128, 8, true));
    assert!(Constant::fits_integer_width(-128, 8, true));
    assert!(!Constant::fits_integer_width(-129, 8, true));
}

#[test]
fn unsigned_rejects_negative_regardless_of_width() {
    assert!(!Constant::fits_integer_width(-1, 64, false));
    assert!(Constant::fits_integer_width(255, 8, false));
    assert!(!Constant::fits_integer_width(256, 8, false));
}

#[test]
fn fold_constant_narrows_only_when_it_fits() {
    let mut types: Arena<hilta::ast::ty::TypeNode> = Arena::new();
    let target_id = types.push(hilta::ast::ty::TypeNode {
        kind: Type::Integer { width: 8, signed: true },
        location: hilta::location::SourceRange::synthetic(),
        doc: None,
    });

    let fits = Constant::Integer { value: 10, ty: target_id };
    let folded = Coercer::fold_constant(&fits, &Type::Integer { width: 8, signed: true }, target_id);
    assert!(matches!(folded, Some(Constant::Integer { value: 10, .. })));

    let overflows = Constant::Integer { value: 1000, ty: target_id };
    let folded = Coercer::fold_constant(&overflows, &Type::Integer { width: 8, signed: true }, target_id);
    assert!(folded.is_none());
}

#[test]
fn fold_constant_handles_integer_to_bool_and_double() {
    let mut types: Arena<hilta::ast::ty::TypeNode> = Arena::new();
    let bool_id = types.push(hilta::ast::ty::TypeNode {
        kind: Type::Bool,
        location: hilta::location::SourceRange::synthetic(),
        doc: None,
    });
    let zero = Constant::Integer { value: 0, ty: bool_id };
    let folded = Coercer::fold_constant(&zero, &Type::Bool, bool_id);
    assert!(matches!(folded, Some(Constant::Bool(false))));

    let nonzero = Constant::Integer { value: 7, ty: bool_id };
    let folded = Coercer::fold_constant(&nonzero, &Type::Bool, bool_id);
    assert!(matches!(folded, Some(Constant::Bool(true))));

    let double_id = types.push(hilta::ast::ty::TypeNode {
        kind: Type::Double,
        location: hilta::location::SourceRange::synthetic(),
        doc: None,
    });
    let seven = Constant::Integer { value: 7, ty: double_id };
    let folded = Coercer::fold_constant(&seven, &Type::Double, double_id);
    assert!(matches!(folded, Some(Constant::Double(v)) if v == 7.0));
}
