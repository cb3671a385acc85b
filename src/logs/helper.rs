//! Call-site helpers over the process-wide factory
//!
//! Each helper fetches [`factory()`], splits its arguments with
//! [`Factory::parse`](super::Factory::parse) and forwards the result to the
//! factory's logger. The `*_ctx` variants first derive a child logger from the
//! context value (and, for [`error_ctx`], from the error).
//!
//! The macros build the argument list at the call site: values first, then
//! fields after a `;`.
//!
//! ```ignore
//! logs::info!("listening on {}", addr);
//! logs::warn!("slow query"; Field::uint("elapsed_ms", 812));
//! logs::error_ctx!(&req, &err, "upload of {} failed", name; Field::string("bucket", bucket));
//! ```

use std::any::Any;
use std::error::Error;
use std::io;

use super::factory::{factory, Arg};

#[track_caller]
pub fn debug(template: &str, args: Vec<Arg>) {
    let f = factory();
    let (msg, fields) = f.parse(template, args);
    f.logger().debug(&msg, &fields);
}

#[track_caller]
pub fn debug_ctx(ctx: &dyn Any, template: &str, args: Vec<Arg>) {
    let f = factory();
    let (msg, fields) = f.parse(template, args);
    f.logger().ctx(ctx).debug(&msg, &fields);
}

#[track_caller]
pub fn info(template: &str, args: Vec<Arg>) {
    let f = factory();
    let (msg, fields) = f.parse(template, args);
    f.logger().info(&msg, &fields);
}

#[track_caller]
pub fn info_ctx(ctx: &dyn Any, template: &str, args: Vec<Arg>) {
    let f = factory();
    let (msg, fields) = f.parse(template, args);
    f.logger().ctx(ctx).info(&msg, &fields);
}

#[track_caller]
pub fn warn(template: &str, args: Vec<Arg>) {
    let f = factory();
    let (msg, fields) = f.parse(template, args);
    f.logger().warn(&msg, &fields);
}

#[track_caller]
pub fn warn_ctx(ctx: &dyn Any, template: &str, args: Vec<Arg>) {
    let f = factory();
    let (msg, fields) = f.parse(template, args);
    f.logger().ctx(ctx).warn(&msg, &fields);
}

#[track_caller]
pub fn error(template: &str, args: Vec<Arg>) {
    let f = factory();
    let (msg, fields) = f.parse(template, args);
    f.logger().error(&msg, &fields);
}

/// Error record annotated with both the error and the context
#[track_caller]
pub fn error_ctx(ctx: &dyn Any, err: &(dyn Error + 'static), template: &str, args: Vec<Arg>) {
    let f = factory();
    let (msg, fields) = f.parse(template, args);
    f.logger().err(err).ctx(ctx).error(&msg, &fields);
}

/// Log, then unwind. Never returns normally.
#[track_caller]
pub fn panic(template: &str, args: Vec<Arg>) -> ! {
    let f = factory();
    let (msg, fields) = f.parse(template, args);
    f.logger().panic(&msg, &fields)
}

#[track_caller]
pub fn panic_ctx(ctx: &dyn Any, template: &str, args: Vec<Arg>) -> ! {
    let f = factory();
    let (msg, fields) = f.parse(template, args);
    f.logger().ctx(ctx).panic(&msg, &fields)
}

/// Log, flush, then exit the process with status 1
#[track_caller]
pub fn fatal(template: &str, args: Vec<Arg>) -> ! {
    let f = factory();
    let (msg, fields) = f.parse(template, args);
    f.logger().fatal(&msg, &fields)
}

#[track_caller]
pub fn fatal_ctx(ctx: &dyn Any, template: &str, args: Vec<Arg>) -> ! {
    let f = factory();
    let (msg, fields) = f.parse(template, args);
    f.logger().ctx(ctx).fatal(&msg, &fields)
}

/// Flush the process-wide logger's sink
pub fn sync() -> io::Result<()> {
    factory().logger().sync()
}

#[doc(hidden)]
#[macro_export]
macro_rules! __logs_call {
    ($func:path, [$($lead:expr),*], $template:expr $(, $value:expr)* $(; $($field:expr),+)?) => {
        $func($($lead,)* $template, {
            #[allow(unused_mut)]
            let mut args = ::std::vec::Vec::<$crate::logs::Arg>::new();
            $( args.push($crate::logs::Arg::value($value)); )*
            $($( args.push($crate::logs::Arg::from($field)); )+)?
            args
        })
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __logs_debug {
    ($($t:tt)+) => { $crate::__logs_call!($crate::logs::debug, [], $($t)+) };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __logs_debug_ctx {
    ($ctx:expr, $($t:tt)+) => { $crate::__logs_call!($crate::logs::debug_ctx, [$ctx], $($t)+) };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __logs_info {
    ($($t:tt)+) => { $crate::__logs_call!($crate::logs::info, [], $($t)+) };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __logs_info_ctx {
    ($ctx:expr, $($t:tt)+) => { $crate::__logs_call!($crate::logs::info_ctx, [$ctx], $($t)+) };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __logs_warn {
    ($($t:tt)+) => { $crate::__logs_call!($crate::logs::warn, [], $($t)+) };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __logs_warn_ctx {
    ($ctx:expr, $($t:tt)+) => { $crate::__logs_call!($crate::logs::warn_ctx, [$ctx], $($t)+) };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __logs_error {
    ($($t:tt)+) => { $crate::__logs_call!($crate::logs::error, [], $($t)+) };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __logs_error_ctx {
    ($ctx:expr, $err:expr, $($t:tt)+) => {
        $crate::__logs_call!($crate::logs::error_ctx, [$ctx, $err], $($t)+)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __logs_panic {
    ($($t:tt)+) => { $crate::__logs_call!($crate::logs::panic, [], $($t)+) };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __logs_panic_ctx {
    ($ctx:expr, $($t:tt)+) => { $crate::__logs_call!($crate::logs::panic_ctx, [$ctx], $($t)+) };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __logs_fatal {
    ($($t:tt)+) => { $crate::__logs_call!($crate::logs::fatal, [], $($t)+) };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __logs_fatal_ctx {
    ($ctx:expr, $($t:tt)+) => { $crate::__logs_call!($crate::logs::fatal_ctx, [$ctx], $($t)+) };
}
