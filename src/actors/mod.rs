// Actor模块 - 使用Actor模式串行化生命周期事件
//
// 通过消息传递驱动服务，事件之间不会交错执行

pub mod lifecycle;

pub use lifecycle::{LifecycleActor, LifecycleCommand, LifecycleHandle};
