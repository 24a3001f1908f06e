//! 被测内核提供的系统调用
//!
//! Return values are the kernel's own sentinels rather than `Result`s: the
//! test programs assert on the exact values (`-1`, `<= 0`, the `join`
//! discriminator), so the harness passes them through untouched.

/// 标准输入的文件描述符
pub const STDIN: i32 = 0;
/// 标准输出的文件描述符
pub const STDOUT: i32 = 1;

pub trait Kernel {
    /// Starts `path` as a child process with `args` as its argv.
    ///
    /// 结果
    /// * PID => 子进程ID
    /// * -1 => 程序不存在，或参数放不下
    fn exec(&self, path: &str, args: &[&str]) -> i32;

    /// Waits for the child `pid` to terminate and stores its exit status.
    ///
    /// 结果
    /// * 1 => 子进程正常退出，`status`为退出码
    /// * 0 => 子进程因未处理的异常而终止
    /// * -1 => `pid`不是当前进程尚未回收的子进程
    fn join(&self, pid: i32, status: &mut i32) -> i32;

    fn exit(&self, status: i32) -> !;

    /// Creates `name`, truncating it if it already exists.
    fn creat(&self, name: &str) -> i32;

    fn open(&self, name: &str) -> i32;

    /// 结果
    /// * n => 读取的字节数，0 表示没有更多数据
    /// * -1 => `fd`无效或不可读
    fn read(&self, fd: i32, buf: &mut [u8]) -> i32;

    fn write(&self, fd: i32, buf: &[u8]) -> i32;

    /// Reads into an arbitrary user address. The kernel must reject
    /// addresses the process cannot write.
    ///
    /// # Safety
    ///
    /// If the kernel accepts the range, it overwrites `len` bytes at `addr`
    /// in this process, whatever lives there.
    unsafe fn read_raw(&self, fd: i32, addr: usize, len: usize) -> i32;

    /// Writes from an arbitrary user address.
    ///
    /// # Safety
    ///
    /// The kernel reads `len` bytes at `addr`; the caller vouches that doing so
    /// is acceptable or expects the kernel to reject the range.
    unsafe fn write_raw(&self, fd: i32, addr: usize, len: usize) -> i32;

    fn close(&self, fd: i32) -> i32;

    fn unlink(&self, name: &str) -> i32;

    fn chdir(&self, path: &str) -> i32;

    fn mkdir(&self, path: &str) -> i32;

    /// 目录非空时失败
    fn rmdir(&self, path: &str) -> i32;

    /// The driver's multiplexed pseudo-syscall, see [`crate::Request`].
    fn ag(&self, request: i32, args: [i32; 2]) -> i32;
}
