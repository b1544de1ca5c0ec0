/// Inner Interpreter
///
/// Indirect-threaded dispatch. Compiled code is a sequence of cells, each
/// an execution token (a word index) except where a preceding LIT, _flit,
/// _slit, _branch, _branchz or _call claims the following cell(s). The
/// loop reads a token, dispatches on the word's code field and returns to
/// read the next; colon definitions push the instruction pointer on the
/// return stack and EXIT pops it.
///
/// The bridge between the host driver and threaded code is a two-cell
/// area [xt, _repl]: `execute` points the instruction pointer at it, and
/// when the word completes the trailing `_repl` token hands control back.
///
use crate::errors::{Result, Throw};
use crate::internals::builtin::Prim;
use crate::internals::signals;
use crate::kernel::{aligned, cell_addr, Cell, CELL, EXEC_START, SYS_TRACE};
use crate::runtime::{Code, ForthRuntime};

impl ForthRuntime {
    /// Run one word to completion, bridging in and out of threaded code.
    pub fn execute(&mut self, xt: usize) -> Result<()> {
        self.kernel.set_cell(EXEC_START, xt as Cell)?;
        self.kernel.set_cell(EXEC_START + CELL, self.xt_repl as Cell)?;
        self.i_threaded(EXEC_START)
    }

    fn u_branch_target(&self, ip: usize, offset: Cell) -> Result<usize> {
        cell_addr(ip as Cell + offset)
    }

    /// The threaded-code loop. `ip` always points at the next cell to
    /// consume. An asynchronous signal turns into a throw at the top of
    /// every cycle, never in the middle of a primitive.
    fn i_threaded(&mut self, mut ip: usize) -> Result<()> {
        loop {
            if let Some(t) = signals::take_pending() {
                return Err(t);
            }
            let mut xt = self.xt_check(self.kernel.get_cell(ip)?)?;
            ip += CELL;
            'dispatch: loop {
                if self.kernel.sys(SYS_TRACE) != 0 {
                    self.u_trace(xt);
                }
                match self.words[xt].code {
                    Code::Enter => {
                        self.kernel.rs_push(ip as Cell)?;
                        ip = self.words[xt].data_addr;
                    }
                    Code::DataField => {
                        self.kernel.push(self.body_addr(xt) as Cell)?;
                    }
                    Code::DoDoes => {
                        // Push the body, remember the caller, continue at
                        // the DOES> suffix saved in the first data cell.
                        let data = self.words[xt].data_addr;
                        self.kernel.push((data + CELL) as Cell)?;
                        self.kernel.rs_push(ip as Cell)?;
                        ip = cell_addr(self.kernel.get_cell(data)?)?;
                    }
                    Code::Marker => self.u_run_marker(xt)?,
                    Code::Prim(p) => match p {
                        Prim::Repl => return Ok(()),
                        Prim::Execute => {
                            let popped = self.kernel.pop()?;
                            xt = self.xt_check(popped)?;
                            continue 'dispatch;
                        }
                        Prim::Exit => {
                            ip = cell_addr(self.kernel.rs_pop()?)?;
                        }
                        Prim::Lit => {
                            let v = self.kernel.get_cell(ip)?;
                            ip += CELL;
                            self.kernel.push(v)?;
                        }
                        Prim::FLit => {
                            let v = self.kernel.get_cell(ip)?;
                            ip += CELL;
                            self.kernel.fs_push(f64::from_bits(v as u64))?;
                        }
                        Prim::SLit => {
                            // [len][bytes, cell aligned] follows inline.
                            let len = cell_addr(self.kernel.get_cell(ip)?)?;
                            self.kernel.push((ip + CELL) as Cell)?;
                            self.kernel.push(len as Cell)?;
                            ip += CELL + aligned(len);
                        }
                        Prim::Branch => {
                            let offset = self.kernel.get_cell(ip)?;
                            ip = self.u_branch_target(ip, offset)?;
                        }
                        Prim::BranchZ => {
                            let offset = self.kernel.get_cell(ip)?;
                            ip = if self.kernel.pop()? == 0 {
                                self.u_branch_target(ip, offset)?
                            } else {
                                ip + CELL
                            };
                        }
                        Prim::Call => {
                            let offset = self.kernel.get_cell(ip)?;
                            self.kernel.rs_push((ip + CELL) as Cell)?;
                            ip = self.u_branch_target(ip, offset)?;
                        }
                        Prim::Does => {
                            self.u_does_patch(ip)?;
                            ip = cell_addr(self.kernel.rs_pop()?)?;
                        }
                        _ => self.run_prim(p)?,
                    },
                }
                break 'dispatch;
            }
        }
    }

    /// DOES> at run time of the defining word: rewrite the newest word to
    /// resume at the cells that follow DOES>, then exit the definer.
    fn u_does_patch(&mut self, ip: usize) -> Result<()> {
        let word = self.words.last_mut().ok_or(Throw::NotCreated)?;
        if !word.was_created() {
            return Err(Throw::NotCreated);
        }
        word.code = Code::DoDoes;
        let data = word.data_addr;
        self.kernel.set_cell(data, ip as Cell)
    }

    /// Leaf primitive dispatch: the "large switch" standing in for
    /// computed goto. Primitives that consume the instruction pointer are
    /// handled in the loop above and are an argument error here.
    fn run_prim(&mut self, prim: Prim) -> Result<()> {
        match prim {
            // Stack.
            Prim::Drop => self.f_drop(),
            Prim::Dup => self.f_dup(),
            Prim::QDup => self.f_qdup(),
            Prim::Swap => self.f_swap(),
            Prim::Over => self.f_over(),
            Prim::Rot => self.f_rot(),
            Prim::Depth => self.f_depth(),
            Prim::Pick => self.f_pick(),
            Prim::Roll => self.f_roll(),
            Prim::ToR => self.f_to_r(),
            Prim::RFrom => self.f_r_from(),
            Prim::RFetch => self.f_r_fetch(),
            // Arithmetic and logic.
            Prim::Add => self.f_add(),
            Prim::Sub => self.f_sub(),
            Prim::Mul => self.f_mul(),
            Prim::Div => self.f_div(),
            Prim::Mod => self.f_mod(),
            Prim::MStar => self.f_m_star(),
            Prim::UmStar => self.f_um_star(),
            Prim::SmDivRem => self.f_sm_div_rem(),
            Prim::UmDivMod => self.f_um_div_mod(),
            Prim::And => self.f_and(),
            Prim::Or => self.f_or(),
            Prim::Xor => self.f_xor(),
            Prim::Invert => self.f_invert(),
            Prim::LShift => self.f_lshift(),
            Prim::RShift => self.f_rshift(),
            // Comparison.
            Prim::ZeroEq => self.f_zero_eq(),
            Prim::ZeroLt => self.f_zero_lt(),
            Prim::Lt => self.f_lt(),
            Prim::ULt => self.f_u_lt(),
            Prim::Eq => self.f_eq(),
            // Memory.
            Prim::Fetch => self.f_fetch(),
            Prim::Store => self.f_store(),
            Prim::CFetch => self.f_c_fetch(),
            Prim::CStore => self.f_c_store(),
            Prim::Move => self.f_move(),
            Prim::Here => self.f_here(),
            Prim::Unused => self.f_unused(),
            Prim::Allot => self.f_allot(),
            Prim::Align => self.f_align(),
            Prim::Cells => self.f_cells(),
            Prim::Chars => self.f_chars(),
            Prim::ToBody => self.f_to_body(),
            Prim::Comma => self.f_comma(),
            // Dynamic memory.
            Prim::Allocate => self.f_allocate(),
            Prim::Free => self.f_free(),
            Prim::Resize => self.f_resize(),
            // Defining and compiling.
            Prim::Tick => self.f_tick(),
            Prim::Colon => self.f_colon(),
            Prim::Noname => self.f_noname(),
            Prim::Semicolon => self.f_semicolon(),
            Prim::Create => self.f_create(),
            Prim::Marker => self.f_marker(),
            Prim::Immediate => self.f_immediate(),
            Prim::IsImmediate => self.f_is_immediate(),
            Prim::CompileOnly => self.f_compile_only(),
            Prim::IsCompileOnly => self.f_is_compile_only(),
            Prim::State => self.f_state(),
            Prim::Evaluate => self.f_evaluate(),
            // Exceptions.
            Prim::Abort => Err(Throw::Abort),
            Prim::AbortQ => self.f_abort_quote(),
            Prim::AbortMsgRt => self.f_abort_msg(),
            Prim::Quit => Err(Throw::Quit),
            Prim::Longjmp => self.f_longjmp(),
            Prim::Bp => self.f_bp(),
            // Control flow immediates.
            Prim::If => self.f_if(),
            Prim::Else => self.f_else(),
            Prim::Then => self.f_then(),
            Prim::Begin => self.f_begin(),
            Prim::Until => self.f_until(),
            Prim::Again => self.f_again(),
            Prim::While => self.f_while(),
            Prim::Repeat => self.f_repeat(),
            // Input and output.
            Prim::Source => self.f_source(),
            Prim::SourceId => self.f_source_id(),
            Prim::ToIn => self.f_to_in(),
            Prim::Refill => self.f_refill(),
            Prim::Accept => self.f_accept(),
            Prim::Key => self.f_key(),
            Prim::KeyReady => self.f_key_ready(),
            Prim::Emit => self.f_emit(),
            Prim::Type => self.f_type(),
            Prim::Cr => self.f_cr(),
            Prim::Dot => self.f_dot(),
            Prim::ParseName => self.f_parse_name(),
            Prim::Parse => self.f_parse(),
            Prim::FindName => self.f_find_name(),
            Prim::Included => self.f_included(),
            Prim::LParen => self.f_paren(),
            Prim::Backslash => self.f_backslash(),
            Prim::SQuote => self.f_s_quote(),
            Prim::DotQuote => self.f_dot_quote(),
            Prim::Ms => self.f_ms(),
            // Blocks.
            Prim::Blk => self.f_blk(),
            Prim::Block => self.f_block(),
            Prim::Buffer => self.f_buffer(),
            Prim::Blocks => self.f_blocks(),
            Prim::Update => self.f_update(),
            Prim::SaveBuffers => self.f_save_buffers(),
            Prim::EmptyBuffers => self.f_empty_buffers(),
            Prim::Load => self.f_load(),
            // Tools.
            Prim::Dump => self.f_dump(),
            Prim::StackDump => self.f_stack_dump(),
            Prim::Seext => self.f_seext(),
            Prim::Words => self.f_words(),
            Prim::Args => self.f_args(),
            Prim::Env => self.f_env(),
            Prim::ByeCode => self.f_bye_code(),
            Prim::Trace => self.f_trace(),
            Prim::Window => self.f_window(),
            Prim::Ds => self.f_ds(),
            Prim::Rs => self.f_rs(),
            // Environment constants.
            Prim::HoldSize => self.f_hold_size(),
            Prim::PadSize => self.f_pad_size(),
            Prim::CharBit => self.f_char_bit(),
            Prim::Floored => self.f_floored(),
            Prim::Base => self.f_base(),
            // Floating point.
            Prim::MaxFloat => self.f_max_float(),
            Prim::Fs => self.f_fs(),
            Prim::ToFloat => self.f_to_float(),
            Prim::FRound => self.f_f_round(),
            Prim::FTrunc => self.f_f_trunc(),
            Prim::FFloor => self.f_f_floor(),
            Prim::FSqrt => self.f_f_sqrt(),
            Prim::FCos => self.f_f_cos(),
            Prim::FSin => self.f_f_sin(),
            Prim::FTan => self.f_f_tan(),
            Prim::FLn => self.f_f_ln(),
            Prim::FLog => self.f_f_log(),
            Prim::FExp => self.f_f_exp(),
            Prim::FMax => self.f_f_max(),
            Prim::FMin => self.f_f_min(),
            Prim::FPow => self.f_f_pow(),
            Prim::FStore => self.f_f_store(),
            Prim::FFetch => self.f_f_fetch(),
            Prim::FAdd => self.f_f_add(),
            Prim::FSub => self.f_f_sub(),
            Prim::FMul => self.f_f_mul(),
            Prim::FDiv => self.f_f_div(),
            Prim::FLt0 => self.f_f_lt0(),
            Prim::FEq0 => self.f_f_eq0(),
            Prim::FSDot => self.f_fs_dot(),
            Prim::FDot => self.f_f_dot(),
            Prim::FToS => self.f_f_to_s(),
            Prim::SToF => self.f_s_to_f(),
            // Threading primitives never reach the leaf dispatcher.
            Prim::Repl
            | Prim::Lit
            | Prim::FLit
            | Prim::SLit
            | Prim::Exit
            | Prim::Execute
            | Prim::Branch
            | Prim::BranchZ
            | Prim::Call
            | Prim::Does => Err(Throw::EInval),
        }
    }
}
