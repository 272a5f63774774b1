/// Simple localization for the terminal page.
/// Locale can be selected via the `--locale` CLI flag (e.g. `--locale zh`).

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Zh,
}

impl Locale {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "zh" | "zh-cn" | "zh_cn" | "zh-hans" | "zh-tw" | "zh_tw" => Self::Zh,
            _ => Self::En,
        }
    }
}

#[derive(Debug)]
pub struct Messages {
    pub status_done: &'static str,
    pub waiting: &'static str,
    pub details_prefix: &'static str,
    pub cycle_failed: &'static str,
    pub stopped: &'static str,
}

pub static EN: Messages = Messages {
    status_done: "downloaded",
    waiting: "waiting for status",
    details_prefix: "details",
    cycle_failed: "status unavailable, retrying",
    stopped: "Progress sync stopped",
};

pub static ZH: Messages = Messages {
    status_done: "已下载",
    waiting: "等待状态",
    details_prefix: "详情",
    cycle_failed: "状态不可用，正在重试",
    stopped: "进度同步已停止",
};

pub fn get_messages(locale: Locale) -> &'static Messages {
    match locale {
        Locale::En => &EN,
        Locale::Zh => &ZH,
    }
}
