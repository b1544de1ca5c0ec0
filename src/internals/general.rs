// General-purpose builtin words: stack manipulation, arithmetic, logic,
// comparison, memory access and the dynamic memory trio.

use std::thread;
use std::time::Duration;

use crate::errors::{Result, Throw};
use crate::kernel::{cell_addr, Cell, BUF_SIZE, CELL, FALSE, SYS_BASE, SYS_STATE, TRUE};
use crate::runtime::ForthRuntime;

fn bool_flag(b: bool) -> Cell {
    if b {
        TRUE
    } else {
        FALSE
    }
}

impl ForthRuntime {
    // -- stack --------------------------------------------------------------

    /// DROP ( x -- )
    pub fn f_drop(&mut self) -> Result<()> {
        self.kernel.pop().map(|_| ())
    }

    /// DUP ( x -- x x )
    pub fn f_dup(&mut self) -> Result<()> {
        let top = self.kernel.top()?;
        self.kernel.push(top)
    }

    /// ?DUP ( x -- x x | 0 )
    pub fn f_qdup(&mut self) -> Result<()> {
        let top = self.kernel.top()?;
        if top != 0 {
            self.kernel.push(top)?;
        }
        Ok(())
    }

    /// SWAP ( x y -- y x )
    pub fn f_swap(&mut self) -> Result<()> {
        let y = self.kernel.pop()?;
        let x = self.kernel.top()?;
        self.kernel.set_top(y)?;
        self.kernel.push(x)
    }

    /// OVER ( x y -- x y x )
    pub fn f_over(&mut self) -> Result<()> {
        let x = self.kernel.pick(1)?;
        self.kernel.push(x)
    }

    /// ROT ( x y z -- y z x )
    pub fn f_rot(&mut self) -> Result<()> {
        self.kernel.ds_can(3, 3)?;
        self.kernel.roll(2)
    }

    /// DEPTH ( -- n )
    pub fn f_depth(&mut self) -> Result<()> {
        let depth = self.kernel.depth() as Cell;
        self.kernel.push(depth)
    }

    /// PICK ( xu ... x0 u -- xu ... x0 xu )  0 PICK is DUP
    pub fn f_pick(&mut self) -> Result<()> {
        let n = self.kernel.pop()?;
        if n < 0 {
            return Err(Throw::EInval);
        }
        let x = self.kernel.pick(n as usize)?;
        self.kernel.push(x)
    }

    /// ROLL ( xu ... x0 u -- xu-1 ... x0 xu )  2 ROLL is ROT
    pub fn f_roll(&mut self) -> Result<()> {
        let n = self.kernel.pop()?;
        if n < 0 {
            return Err(Throw::EInval);
        }
        self.kernel.roll(n as usize)
    }

    /// >R ( x -- ) (R: -- x )
    pub fn f_to_r(&mut self) -> Result<()> {
        let x = self.kernel.pop()?;
        self.kernel.rs_push(x)
    }

    /// R> ( -- x ) (R: x -- )
    pub fn f_r_from(&mut self) -> Result<()> {
        let x = self.kernel.rs_pop()?;
        self.kernel.push(x)
    }

    /// R@ ( -- x ) (R: x -- x )
    pub fn f_r_fetch(&mut self) -> Result<()> {
        let x = self.kernel.rs_top()?;
        self.kernel.push(x)
    }

    // -- arithmetic ---------------------------------------------------------

    /// + ( n1 n2 -- n3 )
    pub fn f_add(&mut self) -> Result<()> {
        let n = self.kernel.pop()?;
        let top = self.kernel.top()?;
        self.kernel.set_top(top.wrapping_add(n))
    }

    /// - ( n1 n2 -- n3 )
    pub fn f_sub(&mut self) -> Result<()> {
        let n = self.kernel.pop()?;
        let top = self.kernel.top()?;
        self.kernel.set_top(top.wrapping_sub(n))
    }

    /// * ( n1 n2 -- n3 )
    pub fn f_mul(&mut self) -> Result<()> {
        let n = self.kernel.pop()?;
        let top = self.kernel.top()?;
        self.kernel.set_top(top.wrapping_mul(n))
    }

    /// / ( n1 n2 -- n3 )
    pub fn f_div(&mut self) -> Result<()> {
        let n = self.kernel.pop()?;
        if n == 0 {
            return Err(Throw::DivZero);
        }
        let top = self.kernel.top()?;
        self.kernel.set_top(top.wrapping_div(n))
    }

    /// MOD ( n1 n2 -- n3 )
    pub fn f_mod(&mut self) -> Result<()> {
        let n = self.kernel.pop()?;
        if n == 0 {
            return Err(Throw::DivZero);
        }
        let top = self.kernel.top()?;
        self.kernel.set_top(top.wrapping_rem(n))
    }

    /// M* ( n1 n2 -- d )  double result, low cell then high
    pub fn f_m_star(&mut self) -> Result<()> {
        let n = self.kernel.pop()?;
        let top = self.kernel.top()?;
        let d = (top as i128) * (n as i128);
        self.kernel.set_top(d as Cell)?;
        self.kernel.push((d >> 64) as Cell)
    }

    /// UM* ( u1 u2 -- ud )
    pub fn f_um_star(&mut self) -> Result<()> {
        let n = self.kernel.pop()? as u64;
        let top = self.kernel.top()? as u64;
        let d = (top as u128) * (n as u128);
        self.kernel.set_top(d as u64 as Cell)?;
        self.kernel.push((d >> 64) as u64 as Cell)
    }

    /// SM/REM ( d dsor -- rem quot )  symmetric division
    pub fn f_sm_div_rem(&mut self) -> Result<()> {
        let dsor = self.kernel.pop()?;
        if dsor == 0 {
            return Err(Throw::DivZero);
        }
        let hi = self.kernel.pop()?;
        let lo = self.kernel.top()?;
        let d = ((hi as i128) << 64) | (lo as u64 as i128);
        let quot = d / dsor as i128;
        let rem = d % dsor as i128;
        self.kernel.set_top(rem as Cell)?;
        self.kernel.push(quot as Cell)
    }

    /// UM/MOD ( ud dsor -- mod quot )
    pub fn f_um_div_mod(&mut self) -> Result<()> {
        let dsor = self.kernel.pop()? as u64;
        if dsor == 0 {
            return Err(Throw::DivZero);
        }
        let hi = self.kernel.pop()? as u64;
        let lo = self.kernel.top()? as u64;
        let d = ((hi as u128) << 64) | lo as u128;
        let quot = d / dsor as u128;
        if quot > u64::MAX as u128 {
            // Quotient will not fit one cell; answer the impossible value.
            self.kernel.set_top(!0)?;
            return self.kernel.push(!0);
        }
        self.kernel.set_top((d % dsor as u128) as Cell)?;
        self.kernel.push(quot as Cell)
    }

    /// AND ( x1 x2 -- x3 )
    pub fn f_and(&mut self) -> Result<()> {
        let n = self.kernel.pop()?;
        let top = self.kernel.top()?;
        self.kernel.set_top(top & n)
    }

    /// OR ( x1 x2 -- x3 )
    pub fn f_or(&mut self) -> Result<()> {
        let n = self.kernel.pop()?;
        let top = self.kernel.top()?;
        self.kernel.set_top(top | n)
    }

    /// XOR ( x1 x2 -- x3 )
    pub fn f_xor(&mut self) -> Result<()> {
        let n = self.kernel.pop()?;
        let top = self.kernel.top()?;
        self.kernel.set_top(top ^ n)
    }

    /// INVERT ( x1 -- x2 )
    pub fn f_invert(&mut self) -> Result<()> {
        let top = self.kernel.top()?;
        self.kernel.set_top(!top)
    }

    /// LSHIFT ( x1 u -- x2 )  shifting out all bits gives zero
    pub fn f_lshift(&mut self) -> Result<()> {
        let u = self.kernel.pop()?;
        let top = self.kernel.top()? as u64;
        self.kernel
            .set_top(top.checked_shl(u as u32).unwrap_or(0) as Cell)
    }

    /// RSHIFT ( x1 u -- x2 )
    pub fn f_rshift(&mut self) -> Result<()> {
        let u = self.kernel.pop()?;
        let top = self.kernel.top()? as u64;
        self.kernel
            .set_top(top.checked_shr(u as u32).unwrap_or(0) as Cell)
    }

    // -- comparison ---------------------------------------------------------

    /// 0= ( x -- flag )
    pub fn f_zero_eq(&mut self) -> Result<()> {
        let top = self.kernel.top()?;
        self.kernel.set_top(bool_flag(top == 0))
    }

    /// 0< ( n -- flag )
    pub fn f_zero_lt(&mut self) -> Result<()> {
        let top = self.kernel.top()?;
        self.kernel.set_top(bool_flag(top < 0))
    }

    /// < ( n1 n2 -- flag )
    pub fn f_lt(&mut self) -> Result<()> {
        let n2 = self.kernel.pop()?;
        let n1 = self.kernel.top()?;
        self.kernel.set_top(bool_flag(n1 < n2))
    }

    /// U< ( u1 u2 -- flag )
    pub fn f_u_lt(&mut self) -> Result<()> {
        let u2 = self.kernel.pop()? as u64;
        let u1 = self.kernel.top()? as u64;
        self.kernel.set_top(bool_flag(u1 < u2))
    }

    /// = ( x1 x2 -- flag )
    pub fn f_eq(&mut self) -> Result<()> {
        let x2 = self.kernel.pop()?;
        let x1 = self.kernel.top()?;
        self.kernel.set_top(bool_flag(x1 == x2))
    }

    // -- memory -------------------------------------------------------------

    /// @ ( aaddr -- x )
    pub fn f_fetch(&mut self) -> Result<()> {
        let addr = cell_addr(self.kernel.top()?)?;
        let v = self.kernel.get_cell(addr)?;
        self.kernel.set_top(v)
    }

    /// ! ( x aaddr -- )
    pub fn f_store(&mut self) -> Result<()> {
        let addr = cell_addr(self.kernel.pop()?)?;
        let x = self.kernel.pop()?;
        self.kernel.set_cell(addr, x)
    }

    /// C@ ( caddr -- char )
    pub fn f_c_fetch(&mut self) -> Result<()> {
        let addr = cell_addr(self.kernel.top()?)?;
        let v = self.kernel.get_byte(addr)?;
        self.kernel.set_top(v as Cell)
    }

    /// C! ( char caddr -- )
    pub fn f_c_store(&mut self) -> Result<()> {
        let addr = cell_addr(self.kernel.pop()?)?;
        let c = self.kernel.pop()?;
        self.kernel.set_byte(addr, c as u8)
    }

    /// MOVE ( src dst u -- )
    pub fn f_move(&mut self) -> Result<()> {
        let u = cell_addr(self.kernel.pop()?)?;
        let dst = cell_addr(self.kernel.pop()?)?;
        let src = cell_addr(self.kernel.pop()?)?;
        self.kernel.move_bytes(src, dst, u)
    }

    /// HERE ( -- addr )
    pub fn f_here(&mut self) -> Result<()> {
        let here = self.kernel.here() as Cell;
        self.kernel.push(here)
    }

    /// UNUSED ( -- u )
    pub fn f_unused(&mut self) -> Result<()> {
        let unused = self.kernel.unused() as Cell;
        self.kernel.push(unused)
    }

    /// ALLOT ( n -- )
    pub fn f_allot(&mut self) -> Result<()> {
        let n = self.kernel.pop()?;
        self.allot(n)
    }

    /// ALIGN ( -- )
    pub fn f_align(&mut self) -> Result<()> {
        self.u_align()
    }

    /// CELLS ( n1 -- n2 )
    pub fn f_cells(&mut self) -> Result<()> {
        let top = self.kernel.top()?;
        self.kernel.set_top(top.wrapping_mul(CELL as Cell))
    }

    /// CHARS ( n1 -- n2 )  a character is one address unit
    pub fn f_chars(&mut self) -> Result<()> {
        self.kernel.top().map(|_| ())
    }

    /// >BODY ( xt -- addr )
    pub fn f_to_body(&mut self) -> Result<()> {
        let xt = self.xt_check(self.kernel.top()?)?;
        if !self.words[xt].was_created() {
            return Err(Throw::NotCreated);
        }
        let body = self.body_addr(xt) as Cell;
        self.kernel.set_top(body)
    }

    /// , ( x -- )  append a cell to the newest word's data area
    pub fn f_comma(&mut self) -> Result<()> {
        let x = self.kernel.pop()?;
        self.word_append(x)
    }

    // -- dynamic memory -----------------------------------------------------

    /// ALLOCATE ( u -- aaddr ior )
    pub fn f_allocate(&mut self) -> Result<()> {
        let u = self.kernel.top()?;
        if u < 0 {
            return Err(Throw::EInval);
        }
        match self.kernel.heap_alloc(u as usize) {
            Some(addr) => {
                self.kernel.set_top(addr as Cell)?;
                self.kernel.push(FALSE)
            }
            None => {
                self.kernel.set_top(0)?;
                self.kernel.push(TRUE)
            }
        }
    }

    /// FREE ( aaddr -- ior )
    pub fn f_free(&mut self) -> Result<()> {
        let addr = cell_addr(self.kernel.top()?)?;
        let ok = self.kernel.heap_free(addr);
        self.kernel.set_top(if ok { 0 } else { -60 })
    }

    /// RESIZE ( aaddr1 u -- aaddr2 ior )
    pub fn f_resize(&mut self) -> Result<()> {
        let u = self.kernel.pop()?;
        if u < 0 {
            return Err(Throw::EInval);
        }
        let addr = cell_addr(self.kernel.top()?)?;
        match self.kernel.heap_resize(addr, u as usize) {
            Some(new) => {
                self.kernel.set_top(new as Cell)?;
                self.kernel.push(0)
            }
            None => self.kernel.push(-61),
        }
    }

    // -- environment constants ----------------------------------------------

    /// /hold ( -- u )  size of a pictured numeric output buffer
    pub fn f_hold_size(&mut self) -> Result<()> {
        self.kernel.push((2 * CELL * 8 + 2) as Cell)
    }

    /// /pad ( -- u )
    pub fn f_pad_size(&mut self) -> Result<()> {
        self.kernel.push(BUF_SIZE as Cell)
    }

    /// address-unit-bits ( -- u )
    pub fn f_char_bit(&mut self) -> Result<()> {
        self.kernel.push(8)
    }

    /// floored ( -- flag )  division is symmetric, not floored
    pub fn f_floored(&mut self) -> Result<()> {
        self.kernel.push(FALSE)
    }

    /// BASE ( -- aaddr )
    pub fn f_base(&mut self) -> Result<()> {
        self.kernel.push(SYS_BASE as Cell)
    }

    /// STATE ( -- aaddr )
    pub fn f_state(&mut self) -> Result<()> {
        self.kernel.push(SYS_STATE as Cell)
    }

    /// _ds ( -- aaddr n s )  data stack base, depth, capacity
    pub fn f_ds(&mut self) -> Result<()> {
        let (base, depth, size) = (
            self.kernel.ds_base() as Cell,
            self.kernel.depth() as Cell,
            self.kernel.ds_size() as Cell,
        );
        self.kernel.push(base)?;
        self.kernel.push(depth)?;
        self.kernel.push(size)
    }

    /// _rs ( -- aaddr n s )
    pub fn f_rs(&mut self) -> Result<()> {
        let (base, depth, size) = (
            self.kernel.rs_base() as Cell,
            self.kernel.rs_depth() as Cell,
            self.kernel.rs_size() as Cell,
        );
        self.kernel.push(base)?;
        self.kernel.push(depth)?;
        self.kernel.push(size)
    }

    /// _longjmp ( n -- )  throw n; zero is a no-op
    pub fn f_longjmp(&mut self) -> Result<()> {
        let n = self.kernel.pop()?;
        if n == 0 {
            return Ok(());
        }
        Err(Throw::from_code(n))
    }

    /// MS ( ms -- )
    pub fn f_ms(&mut self) -> Result<()> {
        let delay = self.kernel.pop()?.max(0) as u64;
        thread::sleep(Duration::from_millis(delay));
        Ok(())
    }
}

//////////////////////////////////////////////
/// TESTS
///
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;

    fn runtime() -> ForthRuntime {
        ForthRuntime::new(&Options::for_test()).unwrap()
    }

    fn with_stack(values: &[Cell]) -> ForthRuntime {
        let mut rt = runtime();
        for v in values {
            rt.kernel.push(*v).unwrap();
        }
        rt
    }

    #[test]
    fn test_dup_drop_identity() {
        let mut rt = with_stack(&[7]);
        rt.f_dup().unwrap();
        rt.f_drop().unwrap();
        assert_eq!(rt.kernel.depth(), 1);
        assert_eq!(rt.kernel.top().unwrap(), 7);
    }

    #[test]
    fn test_swap_swap_identity() {
        let mut rt = with_stack(&[1, 2]);
        rt.f_swap().unwrap();
        rt.f_swap().unwrap();
        assert_eq!(rt.kernel.pop().unwrap(), 2);
        assert_eq!(rt.kernel.pop().unwrap(), 1);
    }

    #[test]
    fn test_to_r_r_from_identity() {
        let mut rt = with_stack(&[42]);
        let rs_before = rt.kernel.rs_depth();
        rt.f_to_r().unwrap();
        rt.f_r_from().unwrap();
        assert_eq!(rt.kernel.pop().unwrap(), 42);
        assert_eq!(rt.kernel.rs_depth(), rs_before);
    }

    #[test]
    fn test_rot_and_over() {
        let mut rt = with_stack(&[1, 2, 3]);
        rt.f_rot().unwrap();
        assert_eq!(rt.kernel.pop().unwrap(), 1);
        assert_eq!(rt.kernel.pop().unwrap(), 3);
        assert_eq!(rt.kernel.pop().unwrap(), 2);

        let mut rt = with_stack(&[5, 6]);
        rt.f_over().unwrap();
        assert_eq!(rt.kernel.pop().unwrap(), 5);
    }

    #[test]
    fn test_division_by_zero_throws() {
        assert_eq!(with_stack(&[1, 0]).f_div(), Err(Throw::DivZero));
        assert_eq!(with_stack(&[1, 0]).f_mod(), Err(Throw::DivZero));
        assert_eq!(with_stack(&[1, 0, 0]).f_um_div_mod(), Err(Throw::DivZero));
    }

    #[test]
    fn test_division_overflow_wraps() {
        let mut rt = with_stack(&[Cell::MIN, -1]);
        rt.f_div().unwrap();
        assert_eq!(rt.kernel.pop().unwrap(), Cell::MIN);
    }

    #[test]
    fn test_um_star_um_div_mod_inverse() {
        // a b UM* b UM/MOD leaves (0, a) for b /= 0 without overflow.
        let (a, b) = (0x1234_5678_9abc_def0u64 as Cell, 37);
        let mut rt = with_stack(&[a, b]);
        rt.f_um_star().unwrap();
        rt.kernel.push(b).unwrap();
        rt.f_um_div_mod().unwrap();
        assert_eq!(rt.kernel.pop().unwrap(), a);
        assert_eq!(rt.kernel.pop().unwrap(), 0);
    }

    #[test]
    fn test_m_star_signs() {
        let mut rt = with_stack(&[-3, 4]);
        rt.f_m_star().unwrap();
        assert_eq!(rt.kernel.pop().unwrap(), -1); // high cell: sign extension
        assert_eq!(rt.kernel.pop().unwrap(), -12);
    }

    #[test]
    fn test_shifts_past_width() {
        let mut rt = with_stack(&[1, 64]);
        rt.f_lshift().unwrap();
        assert_eq!(rt.kernel.pop().unwrap(), 0);
        let mut rt = with_stack(&[-1, 1]);
        rt.f_rshift().unwrap();
        assert_eq!(rt.kernel.pop().unwrap() as u64, u64::MAX >> 1);
    }

    #[test]
    fn test_comparisons() {
        let mut rt = with_stack(&[1, 2]);
        rt.f_lt().unwrap();
        assert_eq!(rt.kernel.pop().unwrap(), TRUE);
        // U< treats -1 as the largest unsigned value.
        let mut rt = with_stack(&[-1, 1]);
        rt.f_u_lt().unwrap();
        assert_eq!(rt.kernel.pop().unwrap(), FALSE);
        let mut rt = with_stack(&[0]);
        rt.f_zero_eq().unwrap();
        assert_eq!(rt.kernel.pop().unwrap(), TRUE);
    }

    #[test]
    fn test_fetch_store_round_trip() {
        let mut rt = runtime();
        let addr = rt.kernel.here() as Cell;
        rt.allot(CELL as Cell).unwrap();
        rt.kernel.push(1234).unwrap();
        rt.kernel.push(addr).unwrap();
        rt.f_store().unwrap();
        rt.kernel.push(addr).unwrap();
        rt.f_fetch().unwrap();
        assert_eq!(rt.kernel.pop().unwrap(), 1234);
    }

    #[test]
    fn test_c_store_and_move() {
        let mut rt = runtime();
        let addr = rt.kernel.here();
        rt.allot(16).unwrap();
        for (i, b) in b"abc".iter().enumerate() {
            rt.kernel.push(*b as Cell).unwrap();
            rt.kernel.push((addr + i) as Cell).unwrap();
            rt.f_c_store().unwrap();
        }
        rt.kernel.push(addr as Cell).unwrap();
        rt.kernel.push((addr + 8) as Cell).unwrap();
        rt.kernel.push(3).unwrap();
        rt.f_move().unwrap();
        assert_eq!(rt.kernel.str_at(addr + 8, 3).unwrap(), "abc");
    }

    #[test]
    fn test_allocate_free() {
        let mut rt = with_stack(&[128]);
        rt.f_allocate().unwrap();
        assert_eq!(rt.kernel.pop().unwrap(), 0);
        let addr = rt.kernel.top().unwrap();
        assert!(rt.kernel.heap_contains(addr as usize));
        rt.f_free().unwrap();
        assert_eq!(rt.kernel.pop().unwrap(), 0);
    }

    #[test]
    fn test_literal_round_trip_through_memory() {
        // Any representable cell survives a store/fetch round trip.
        for n in [0, 1, -1, Cell::MAX, Cell::MIN, 0x5a5a_a5a5_5a5a_a5a5u64 as Cell] {
            let mut rt = runtime();
            let addr = rt.kernel.here() as Cell;
            rt.allot(CELL as Cell).unwrap();
            rt.kernel.push(n).unwrap();
            rt.kernel.push(addr).unwrap();
            rt.f_store().unwrap();
            rt.kernel.push(addr).unwrap();
            rt.f_fetch().unwrap();
            assert_eq!(rt.kernel.pop().unwrap(), n);
        }
    }
}
