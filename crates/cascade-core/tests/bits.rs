use std::cmp::Ordering;

use cascade_core::bits::{Bits, BitsError};

#[test]
fn test_from_u64_truncates_to_width() {
    let b = Bits::from_u64(4, 0xff);
    assert_eq!(b.width(), 4);
    assert_eq!(b.to_u64(), 0xf);
}

#[test]
fn test_zero_width_is_promoted_to_one_bit() {
    assert_eq!(Bits::new(0).width(), 1);
}

#[test]
fn test_from_i64_sign_extends_across_words() {
    let b = Bits::from_i64(100, -1);
    assert!(b.is_signed());
    assert!(b.reduce_and());
    assert_eq!(b.to_string_radix(10), "-1");
}

#[test]
fn test_parse_radix_sizes_to_value() {
    let b = Bits::parse_radix("1010", 2).unwrap();
    assert_eq!(b.width(), 4);
    assert_eq!(b.to_u64(), 10);

    let b = Bits::parse_radix("dead_beef", 16).unwrap();
    assert_eq!(b.width(), 32);
    assert_eq!(b.to_u64(), 0xdead_beef);

    let b = Bits::parse_radix("0", 10).unwrap();
    assert_eq!(b.width(), 1);
}

#[test]
fn test_parse_radix_wide_decimal() {
    let b = Bits::parse_radix("340282366920938463463374607431768211455", 10).unwrap();
    assert_eq!(b.width(), 128);
    assert!(b.reduce_and());
}

#[test]
fn test_parse_radix_errors() {
    assert_eq!(
        Bits::parse_radix("12", 2),
        Err(BitsError::InvalidDigit { digit: '2', radix: 2 })
    );
    assert_eq!(Bits::parse_radix("__", 16), Err(BitsError::Empty));
    assert_eq!(Bits::parse_radix("1", 3), Err(BitsError::UnsupportedRadix(3)));
}

#[test]
fn test_get_set_out_of_range() {
    let mut b = Bits::new(4);
    b.set(2, true);
    b.set(9, true);
    assert!(b.get(2));
    assert!(!b.get(9));
    assert_eq!(b.to_u64(), 4);
}

#[test]
fn test_extend_signed_and_unsigned() {
    let s = Bits::from_u64(4, 0b1000).with_signed(true);
    assert_eq!(s.extended(8).to_u64(), 0xf8);
    let u = Bits::from_u64(4, 0b1000);
    assert_eq!(u.extended(8).to_u64(), 0x08);
}

#[test]
fn test_slice_and_assign_slice() {
    let b = Bits::from_u64(16, 0xabcd);
    assert_eq!(b.slice(11, 4).to_u64(), 0xbc);
    assert_eq!(b.slice(4, 11).to_u64(), 0xbc);

    let mut c = Bits::new(16);
    c.assign_slice(7, 4, &Bits::from_u64(4, 0xf));
    assert_eq!(c.to_u64(), 0xf0);
}

#[test]
fn test_concat_places_self_high() {
    let hi = Bits::from_u64(4, 0xa);
    let lo = Bits::from_u64(4, 0x5);
    let c = hi.concat(&lo);
    assert_eq!(c.width(), 8);
    assert_eq!(c.to_u64(), 0xa5);
}

#[test]
fn test_add_carries_between_words() {
    let a = Bits::from_u64(128, u64::MAX);
    let b = Bits::from_u64(128, 1);
    let sum = a.add(&b);
    assert_eq!(sum.words(), &[0, 1]);
}

#[test]
fn test_add_wraps_at_width() {
    let a = Bits::from_u64(4, 15);
    let b = Bits::from_u64(4, 1);
    assert_eq!(a.add(&b).to_u64(), 0);
}

#[test]
fn test_sub_and_neg() {
    let a = Bits::from_u64(8, 3);
    let b = Bits::from_u64(8, 5);
    assert_eq!(a.sub(&b).to_u64(), 0xfe);
    assert_eq!(b.neg().to_u64(), 0xfb);
}

#[test]
fn test_mul_wide() {
    let a = Bits::from_u64(128, u64::MAX);
    let b = Bits::from_u64(128, 2);
    assert_eq!(a.mul(&b).words(), &[u64::MAX - 1, 1]);
}

#[test]
fn test_div_rem_unsigned() {
    let a = Bits::from_u64(8, 17);
    let b = Bits::from_u64(8, 5);
    assert_eq!(a.div(&b).to_u64(), 3);
    assert_eq!(a.rem(&b).to_u64(), 2);
}

#[test]
fn test_div_rem_signed() {
    let a = Bits::from_i64(32, -7);
    let b = Bits::from_i64(32, 2);
    assert_eq!(a.div(&b).to_i64(), -3);
    assert_eq!(a.rem(&b).to_i64(), -1);
}

#[test]
fn test_div_by_zero_is_zero() {
    let a = Bits::from_u64(8, 9);
    let z = Bits::new(8);
    assert!(a.div(&z).is_zero());
    assert!(a.rem(&z).is_zero());
}

#[test]
fn test_div_wide() {
    let a = Bits::parse_radix("100000000000000000000000000000", 10)
        .unwrap()
        .resized(128);
    let b = Bits::from_u64(128, 1_000_000_000_000_000);
    assert_eq!(a.div(&b).to_string_radix(10), "100000000000000");
    assert!(a.rem(&b).is_zero());
}

#[test]
fn test_pow() {
    let a = Bits::from_u64(32, 2);
    let b = Bits::from_u64(32, 4);
    assert_eq!(a.pow(&b).to_u64(), 16);
    assert_eq!(Bits::from_u64(8, 3).pow(&Bits::from_u64(8, 5)).to_u64(), 243);
}

#[test]
fn test_shifts() {
    let a = Bits::from_u64(8, 0b1001_0110);
    assert_eq!(a.shl(2).to_u64(), 0b0101_1000);
    assert_eq!(a.lshr(3).to_u64(), 0b0001_0010);
    assert_eq!(a.clone().with_signed(true).ashr(3).to_u64(), 0b1111_0010);
    assert!(a.shl(8).is_zero());
}

#[test]
fn test_shift_across_words() {
    let a = Bits::from_u64(128, 1);
    let b = a.shl(100);
    assert!(b.get(100));
    assert_eq!(b.lshr(100).to_u64(), 1);
    assert_eq!(Bits::from_u64(128, 0b11).shl(63).words(), &[1 << 63, 1]);
}

#[test]
fn test_bitwise() {
    let a = Bits::from_u64(4, 0b1100);
    let b = Bits::from_u64(4, 0b1010);
    assert_eq!(a.and(&b).to_u64(), 0b1000);
    assert_eq!(a.or(&b).to_u64(), 0b1110);
    assert_eq!(a.xor(&b).to_u64(), 0b0110);
    assert_eq!(a.xnor(&b).to_u64(), 0b1001);
    assert_eq!(a.not().to_u64(), 0b0011);
}

#[test]
fn test_compare_signed_and_unsigned() {
    let a = Bits::from_i64(8, -1);
    let b = Bits::from_i64(8, 1);
    assert_eq!(a.compare(&b), Ordering::Less);
    assert_eq!(a.ucmp(&b), Ordering::Greater);
}

#[test]
fn test_reductions() {
    assert!(Bits::from_u64(3, 0b111).reduce_and());
    assert!(!Bits::from_u64(3, 0b101).reduce_and());
    assert!(Bits::from_u64(3, 0b100).reduce_or());
    assert!(Bits::from_u64(3, 0b111).reduce_xor());
    assert!(!Bits::from_u64(3, 0b101).reduce_xor());
}

#[test]
fn test_formatting() {
    let b = Bits::from_u64(64, u64::MAX);
    assert_eq!(b.to_string_radix(16), "ffffffffffffffff");
    assert_eq!(Bits::from_u64(8, 5).to_string_radix(2), "101");
    assert_eq!(Bits::from_u64(8, 8).to_string_radix(8), "10");
    assert_eq!(Bits::new(8).to_string_radix(16), "0");
    assert_eq!(Bits::from_u64(8, 170).to_string(), "170");
}

#[test]
fn test_wide_decimal_formatting() {
    let b = Bits::from_u64(128, u64::MAX).add(&Bits::from_u64(128, 1));
    assert_eq!(b.to_string(), "18446744073709551616");
}

#[test]
fn test_to_ascii() {
    let hi = Bits::from_u64(8, b'h' as u64);
    let lo = Bits::from_u64(8, b'i' as u64);
    assert_eq!(hi.concat(&lo).resized(24).to_ascii(), "hi");
}

#[test]
fn test_literal_round_trip() {
    let b = Bits::from_i64(12, -3);
    let text = b.to_literal();
    assert_eq!(text, "12'shffd");
    assert_eq!(text.parse::<Bits>().unwrap(), b);
}

#[test]
fn test_literal_rejects_garbage() {
    assert!("hello".parse::<Bits>().is_err());
    assert!("8'zff".parse::<Bits>().is_err());
}

#[test]
fn test_serde_json_uses_literal() {
    let b = Bits::from_u64(16, 0xbeef);
    let json = serde_json::to_string(&b).unwrap();
    assert_eq!(json, "\"16'hbeef\"");
    let back: Bits = serde_json::from_str(&json).unwrap();
    assert_eq!(back, b);
}

#[test]
fn test_assign_keeps_destination_shape() {
    let mut dst = Bits::new(4);
    dst.assign(&Bits::from_u64(8, 0xab));
    assert_eq!(dst.width(), 4);
    assert_eq!(dst.to_u64(), 0xb);
}
