//! The kernel under test, reached through `ecall`.

use alloc::ffi::CString;
use alloc::vec::Vec;
use core::arch::asm;
use core::ptr;

use crate::Kernel;

const EXIT: usize = 1;
const EXEC: usize = 2;
const JOIN: usize = 3;
const CREAT: usize = 4;
const OPEN: usize = 5;
const READ: usize = 6;
const WRITE: usize = 7;
const CLOSE: usize = 8;
const UNLINK: usize = 9;
const MKDIR: usize = 10;
const RMDIR: usize = 11;
const CHDIR: usize = 12;
/// 驱动的伪系统调用，原 ABI 中的 -1
const AG: usize = usize::MAX;

fn syscall(id: usize, args: [usize; 3]) -> isize {
    let mut ret;
    unsafe {
        asm!(
            "ecall",
            inlateout("x10") args[0] => ret,
            in("x11") args[1],
            in("x12") args[2],
            in("x17") id
        );
    }

    ret
}

fn path_syscall(id: usize, path: &str) -> i32 {
    let Ok(path) = CString::new(path) else {
        return -1;
    };
    syscall(id, [path.as_ptr() as usize, 0, 0]) as i32
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GuestKernel;

impl Kernel for GuestKernel {
    fn exec(&self, path: &str, args: &[&str]) -> i32 {
        let Ok(path) = CString::new(path) else {
            return -1;
        };
        let Ok(args) = args
            .iter()
            .map(|&arg| CString::new(arg))
            .collect::<Result<Vec<_>, _>>()
        else {
            return -1;
        };
        let mut argv: Vec<*const u8> = args.iter().map(|arg| arg.as_ptr().cast()).collect();
        argv.push(ptr::null());

        syscall(
            EXEC,
            [path.as_ptr() as usize, args.len(), argv.as_ptr() as usize],
        ) as i32
    }

    fn join(&self, pid: i32, status: &mut i32) -> i32 {
        syscall(JOIN, [pid as usize, status as *mut i32 as usize, 0]) as i32
    }

    fn exit(&self, status: i32) -> ! {
        syscall(EXIT, [status as usize, 0, 0]);
        unreachable!("exit never returns")
    }

    fn creat(&self, name: &str) -> i32 {
        path_syscall(CREAT, name)
    }

    fn open(&self, name: &str) -> i32 {
        path_syscall(OPEN, name)
    }

    fn read(&self, fd: i32, buf: &mut [u8]) -> i32 {
        unsafe { self.read_raw(fd, buf.as_mut_ptr() as usize, buf.len()) }
    }

    fn write(&self, fd: i32, buf: &[u8]) -> i32 {
        unsafe { self.write_raw(fd, buf.as_ptr() as usize, buf.len()) }
    }

    unsafe fn read_raw(&self, fd: i32, addr: usize, len: usize) -> i32 {
        syscall(READ, [fd as usize, addr, len]) as i32
    }

    unsafe fn write_raw(&self, fd: i32, addr: usize, len: usize) -> i32 {
        syscall(WRITE, [fd as usize, addr, len]) as i32
    }

    fn close(&self, fd: i32) -> i32 {
        syscall(CLOSE, [fd as usize, 0, 0]) as i32
    }

    fn unlink(&self, name: &str) -> i32 {
        path_syscall(UNLINK, name)
    }

    fn chdir(&self, path: &str) -> i32 {
        path_syscall(CHDIR, path)
    }

    fn mkdir(&self, path: &str) -> i32 {
        path_syscall(MKDIR, path)
    }

    fn rmdir(&self, path: &str) -> i32 {
        path_syscall(RMDIR, path)
    }

    fn ag(&self, request: i32, [a0, a1]: [i32; 2]) -> i32 {
        syscall(AG, [request as usize, a0 as usize, a1 as usize]) as i32
    }
}
