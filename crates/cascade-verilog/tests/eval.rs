use cascade_core::bits::Bits;
use cascade_verilog::eval::{const_eval, split, Evaluator, NoStore, Store, Target};
use cascade_verilog::ir::{
    Access, BinaryOp, Expr, ExprKind, LValue, Select, UnaryOp, Var, VarKind,
};

fn binary(op: BinaryOp, a: Expr, b: Expr, width: usize, signed: bool) -> Expr {
    Expr {
        kind: ExprKind::Binary(op, Box::new(a), Box::new(b)),
        width,
        signed,
    }
}

fn unsigned(width: usize, val: u64) -> Expr {
    Expr::constant(Bits::from_u64(width, val))
}

fn signed(width: usize, val: i64) -> Expr {
    Expr::constant(Bits::from_i64(width, val))
}

fn var(name: &str, width: usize, range: (i64, i64)) -> Var {
    Var {
        name: name.to_string(),
        width,
        signed: false,
        range,
        dims: Vec::new(),
        kind: VarKind::Variable,
        std_port: None,
    }
}

struct Values(Vec<Bits>);

impl Store for Values {
    fn read(&self, var: usize, _element: usize) -> &Bits {
        &self.0[var]
    }

    fn time(&self) -> u64 {
        0
    }
}

#[test]
fn test_context_width_keeps_carry() {
    let sum = binary(BinaryOp::Add, unsigned(4, 15), unsigned(4, 1), 4, false);
    assert_eq!(const_eval(&sum).to_u64(), 0);
    let wide = Evaluator::new(&[], &NoStore).eval_for(&sum, 5);
    assert_eq!(wide.to_u64(), 16);
    assert_eq!(wide.width(), 5);
}

#[test]
fn test_signed_comparison() {
    let lt = binary(BinaryOp::Lt, signed(8, -1), signed(8, 1), 1, false);
    assert!(const_eval(&lt).to_bool());
    // One unsigned operand makes the comparison unsigned.
    let ult = binary(BinaryOp::Lt, signed(8, -1), unsigned(8, 1), 1, false);
    assert!(!const_eval(&ult).to_bool());
}

#[test]
fn test_arithmetic_shift() {
    let shr = binary(BinaryOp::AShr, signed(8, -8), unsigned(32, 1), 8, true);
    assert_eq!(const_eval(&shr).to_i64(), -4);
    let lshr = binary(BinaryOp::AShr, unsigned(8, 0x80), unsigned(32, 1), 8, false);
    assert_eq!(const_eval(&lshr).to_u64(), 0x40);
}

#[test]
fn test_reduction_is_self_determined() {
    let e = Expr {
        kind: ExprKind::Unary(UnaryOp::RedAnd, Box::new(unsigned(3, 7))),
        width: 1,
        signed: false,
    };
    let out = Evaluator::new(&[], &NoStore).eval_for(&e, 8);
    assert_eq!(out.to_u64(), 1);
}

#[test]
fn test_division_by_zero_is_zero() {
    let div = binary(BinaryOp::Div, unsigned(8, 9), unsigned(8, 0), 8, false);
    assert_eq!(const_eval(&div).to_u64(), 0);
}

#[test]
fn test_load_with_descending_range() {
    // reg [0:7] x; x[0] is the most significant bit.
    let vars = vec![var("x", 8, (0, 7))];
    let store = Values(vec![Bits::from_u64(8, 0x80)]);
    let e = Expr {
        kind: ExprKind::Load(Access {
            var: 0,
            indices: Vec::new(),
            select: Select::Bit(Box::new(unsigned(32, 0))),
        }),
        width: 1,
        signed: false,
    };
    assert!(Evaluator::new(&vars, &store).eval(&e).to_bool());
}

#[test]
fn test_out_of_range_bit_reads_zero() {
    let vars = vec![var("x", 4, (3, 0))];
    let store = Values(vec![Bits::from_u64(4, 0xf)]);
    let e = Expr {
        kind: ExprKind::Load(Access {
            var: 0,
            indices: Vec::new(),
            select: Select::Bit(Box::new(unsigned(32, 9))),
        }),
        width: 1,
        signed: false,
    };
    assert!(!Evaluator::new(&vars, &store).eval(&e).to_bool());
}

#[test]
fn test_concat_targets_split_msb_first() {
    let vars = vec![var("a", 4, (3, 0)), var("b", 4, (3, 0))];
    let store = Values(vec![Bits::new(4), Bits::new(4)]);
    let whole = |v| {
        LValue::Access(Access {
            var: v,
            indices: Vec::new(),
            select: Select::Whole,
        })
    };
    let lv = LValue::Concat(vec![whole(0), whole(1)]);
    let targets = Evaluator::new(&vars, &store).targets(&lv);
    let parts = split(&Bits::from_u64(8, 0xa5), targets);
    assert_eq!(parts.len(), 2);
    assert_eq!(
        parts[0].0,
        Target {
            var: 0,
            element: 0,
            lsb: 0,
            width: 4
        }
    );
    assert_eq!(parts[0].1.to_u64(), 0xa);
    assert_eq!(parts[1].1.to_u64(), 0x5);
}
