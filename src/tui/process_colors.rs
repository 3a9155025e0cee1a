use crate::parser::ProcessNode;
use ratatui::style::Color;

/// Returns the bar color for a process based on what kind of process it is
pub fn process_category_color(node: &ProcessNode) -> Color {
    let name = node
        .exe
        .as_deref()
        .and_then(|exe| exe.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .unwrap_or(&node.cmd);

    command_category_color(name)
}

/// Returns the color for a command name
pub fn command_category_color(name: &str) -> Color {
    // Kernel threads carry a per-cpu suffix: kworker/0:1, ksoftirqd/3
    let base = name.split('/').next().unwrap_or(name);

    match base {
        // Init and service managers - Magenta
        "init" | "systemd" | "upstart" | "openrc" | "runit" | "s6-svscan" | "k-boot" => {
            Color::Magenta
        }

        // Kernel threads - Blue
        "kthreadd" | "kworker" | "ksoftirqd" | "kswapd0" | "migration" | "rcu_sched"
        | "rcu_preempt" | "watchdog" | "khugepaged" | "kblockd" | "kcompactd0" => Color::Blue,

        // Device setup - Cyan
        "udevd" | "systemd-udevd" | "udevadm" | "modprobe" | "kmod" | "insmod"
        | "udev-worker" => Color::Cyan,

        // Shells and scripts - Yellow
        "sh" | "bash" | "dash" | "ash" | "zsh" | "busybox" | "rc" => Color::Yellow,

        // Storage and filesystems - LightYellow
        "fsck" | "e2fsck" | "mount" | "umount" | "lvm" | "cryptsetup" | "mdadm" | "swapon"
        | "systemd-fsck" | "systemd-remount-fs" => Color::LightYellow,

        // Network - Green
        "NetworkManager" | "dhclient" | "dhcpcd" | "wpa_supplicant" | "sshd" | "ip"
        | "systemd-networkd" | "systemd-resolved" | "avahi-daemon" => Color::Green,

        // Logging and IPC - LightBlue
        "dbus-daemon" | "dbus-broker" | "rsyslogd" | "syslogd" | "systemd-journald"
        | "klogd" => Color::LightBlue,

        // Login and display - LightMagenta
        "getty" | "agetty" | "login" | "gdm" | "lightdm" | "sddm" | "Xorg" | "Xwayland" => {
            Color::LightMagenta
        }

        // Kernel initcalls and everything else - Gray
        _ if base.ends_with("_init") => Color::LightGreen,
        _ => Color::Gray,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_colors() {
        assert_eq!(command_category_color("systemd"), Color::Magenta);
        assert_eq!(command_category_color("kworker/0:1"), Color::Blue);
        assert_eq!(command_category_color("pci_init"), Color::LightGreen);
        assert_eq!(command_category_color("firefox"), Color::Gray);
    }

    #[test]
    fn test_exe_basename_wins() {
        let mut node = ProcessNode::new(40, 1, "(udev-worker)", 0.0, 1.0);
        node.exe = Some("/usr/lib/systemd/systemd-udevd".to_string());
        assert_eq!(process_category_color(&node), Color::Cyan);
    }
}
