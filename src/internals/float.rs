// Floating point word set.
//
// Floats live on their own stack with the same bounded/sentinel
// discipline as the others; F@ and F! move f64 bit patterns through
// ordinary cells so float values can be stored anywhere in memory.

use crate::errors::{Result, Throw};
use crate::kernel::{cell_addr, Cell, FALSE, TRUE};
use crate::runtime::ForthRuntime;

impl ForthRuntime {
    /// max-float (F: -- f )
    pub fn f_max_float(&mut self) -> Result<()> {
        self.kernel.fs_push(f64::MAX)
    }

    /// _fs ( -- aaddr n s )  float stack base, depth, capacity
    pub fn f_fs(&mut self) -> Result<()> {
        let (base, depth, size) = (
            self.kernel.fs_base() as Cell,
            self.kernel.fs_depth() as Cell,
            self.kernel.fs_size() as Cell,
        );
        self.kernel.push(base)?;
        self.kernel.push(depth)?;
        self.kernel.push(size)
    }

    /// >FLOAT ( caddr u -- flag ) (F: -- f | )
    pub fn f_to_float(&mut self) -> Result<()> {
        let len = cell_addr(self.kernel.pop()?)?;
        let addr = cell_addr(self.kernel.top()?)?;
        let text = self.kernel.str_at(addr, len)?;
        match text.trim().parse::<f64>() {
            Ok(f) => {
                self.kernel.fs_push(f)?;
                self.kernel.set_top(TRUE)
            }
            Err(_) => self.kernel.set_top(FALSE),
        }
    }

    fn u_f_unary(&mut self, op: fn(f64) -> f64) -> Result<()> {
        let f = self.kernel.fs_top()?;
        self.kernel.fs_set_top(op(f))
    }

    fn u_f_binary(&mut self, op: fn(f64, f64) -> f64) -> Result<()> {
        let f2 = self.kernel.fs_pop()?;
        let f1 = self.kernel.fs_top()?;
        self.kernel.fs_set_top(op(f1, f2))
    }

    /// FROUND (F: f1 -- f2 )
    pub fn f_f_round(&mut self) -> Result<()> {
        self.u_f_unary(f64::round)
    }

    /// FTRUNC (F: f1 -- f2 )
    pub fn f_f_trunc(&mut self) -> Result<()> {
        self.u_f_unary(f64::trunc)
    }

    /// FLOOR (F: f1 -- f2 )
    pub fn f_f_floor(&mut self) -> Result<()> {
        self.u_f_unary(f64::floor)
    }

    /// FSQRT (F: f1 -- f2 )
    pub fn f_f_sqrt(&mut self) -> Result<()> {
        self.u_f_unary(f64::sqrt)
    }

    /// FCOS (F: f1 -- f2 )
    pub fn f_f_cos(&mut self) -> Result<()> {
        self.u_f_unary(f64::cos)
    }

    /// FSIN (F: f1 -- f2 )
    pub fn f_f_sin(&mut self) -> Result<()> {
        self.u_f_unary(f64::sin)
    }

    /// FTAN (F: f1 -- f2 )
    pub fn f_f_tan(&mut self) -> Result<()> {
        self.u_f_unary(f64::tan)
    }

    /// FLN (F: f1 -- f2 )
    pub fn f_f_ln(&mut self) -> Result<()> {
        self.u_f_unary(f64::ln)
    }

    /// FLOG (F: f1 -- f2 )
    pub fn f_f_log(&mut self) -> Result<()> {
        self.u_f_unary(f64::log10)
    }

    /// FEXP (F: f1 -- f2 )
    pub fn f_f_exp(&mut self) -> Result<()> {
        self.u_f_unary(f64::exp)
    }

    /// FMAX (F: f1 f2 -- f3 )
    pub fn f_f_max(&mut self) -> Result<()> {
        self.u_f_binary(f64::max)
    }

    /// FMIN (F: f1 f2 -- f3 )
    pub fn f_f_min(&mut self) -> Result<()> {
        self.u_f_binary(f64::min)
    }

    /// F** (F: f1 f2 -- f3 )
    pub fn f_f_pow(&mut self) -> Result<()> {
        self.u_f_binary(f64::powf)
    }

    /// F! ( aaddr -- ) (F: f -- )
    pub fn f_f_store(&mut self) -> Result<()> {
        let addr = cell_addr(self.kernel.pop()?)?;
        let f = self.kernel.fs_pop()?;
        self.kernel.set_cell(addr, f.to_bits() as Cell)
    }

    /// F@ ( aaddr -- ) (F: -- f )
    pub fn f_f_fetch(&mut self) -> Result<()> {
        let addr = cell_addr(self.kernel.pop()?)?;
        let bits = self.kernel.get_cell(addr)?;
        self.kernel.fs_push(f64::from_bits(bits as u64))
    }

    /// F+ (F: f1 f2 -- f3 )
    pub fn f_f_add(&mut self) -> Result<()> {
        self.u_f_binary(|a, b| a + b)
    }

    /// F- (F: f1 f2 -- f3 )
    pub fn f_f_sub(&mut self) -> Result<()> {
        self.u_f_binary(|a, b| a - b)
    }

    /// F* (F: f1 f2 -- f3 )
    pub fn f_f_mul(&mut self) -> Result<()> {
        self.u_f_binary(|a, b| a * b)
    }

    /// F/ (F: f1 f2 -- f3 )
    pub fn f_f_div(&mut self) -> Result<()> {
        let f2 = self.kernel.fs_pop()?;
        if f2 == 0.0 {
            return Err(Throw::DivZero);
        }
        let f1 = self.kernel.fs_top()?;
        self.kernel.fs_set_top(f1 / f2)
    }

    /// F0< (F: f -- ) ( -- flag )
    pub fn f_f_lt0(&mut self) -> Result<()> {
        let f = self.kernel.fs_pop()?;
        self.kernel.push(if f < 0.0 { TRUE } else { FALSE })
    }

    /// F0= (F: f -- ) ( -- flag )
    pub fn f_f_eq0(&mut self) -> Result<()> {
        let f = self.kernel.fs_pop()?;
        self.kernel.push(if f == 0.0 { TRUE } else { FALSE })
    }

    /// FS. (F: f -- )  scientific notation; decimal radix only
    pub fn f_fs_dot(&mut self) -> Result<()> {
        if self.radix() != 10 {
            return Err(Throw::BadBase);
        }
        let f = self.kernel.fs_pop()?;
        print!("{:.*e} ", self.precision, f);
        Ok(())
    }

    /// F. (F: f -- )  decimal radix only
    pub fn f_f_dot(&mut self) -> Result<()> {
        if self.radix() != 10 {
            return Err(Throw::BadBase);
        }
        let f = self.kernel.fs_pop()?;
        print!("{:.*} ", self.precision, f);
        Ok(())
    }

    /// F>S (F: f -- ) ( -- n )
    pub fn f_f_to_s(&mut self) -> Result<()> {
        let f = self.kernel.fs_pop()?;
        self.kernel.push(f as Cell)
    }

    /// S>F ( n -- ) (F: -- f )
    pub fn f_s_to_f(&mut self) -> Result<()> {
        let n = self.kernel.pop()?;
        self.kernel.fs_push(n as f64)
    }
}
