#[cfg(test)]
pub mod test {
    /// A reverse-proxy document exercising repeated directives, duplicate
    /// params, flag params, empty-string args, placeholders and comments.
    pub const SITES: &str = r#"# WS
https://0.0.0.0:{$portof_ws} {
	log {$BRUNO_HOME}/data/mai/log/ws-proxy.log
	tls {$BRUNO_HOME}/ssl/dev.crt.pem {$BRUNO_HOME}/ssl/dev.key.pem {
		protocols tls1.0 tls1.2
	}

	proxy /dealer/allomany http://localhost:{$portof_dealer} {
		header_upstream X-Forward-For {remote}
		without /dealer/allomany
	}
	proxy /inphone unix:{$BRUNO_HOME}/data/ws/callcenter.socket {
		without /inphone
	}
	proxy /test http://localhost:{$portof_ws_1} {
		header_upstream -Proxy ""
	}

	rewrite {
		r /Dealer/(.*)
		to /letme/Dealer/{1}
	}
	rewrite {
		r ^(/letme)?/Dealer/Dealer/(.*)
		to /letme/Dealer/{1}
	}

	#proxy / http://localhost:{$portof_ws_1} {
	proxy / unix:{$BRUNO_HOME}/data/ws/ws-1.socket unix:{$BRUNO_HOME}/data/ws/ws-2.socket {
		header_upstream -Proxy ""
		header_upstream X-Forwarded-For {remote}
		fail_timeout 9s
		max_fails 1
		policy least_conn
		transparent
	}
}

# AODB
http://0.0.0.0:{$portof_aodb_http} {
	log {$BRUNO_HOME}/data/mai/log/aodb-proxy.log
	gzip

	proxy /_koord http://localhost:{$portof_mevv} {
		header_upstream -Proxy ""
		without /_koord
	}
}

http://0.0.0.0:4444 {
	log {$BRUNO_HOME}/data/mai/log/grafana-proxy.log
	proxy /metrics http://localhost:{$portof_ws_1}/metrics {
		without /metrics
	}
}
"#;

    /// Two listeners sharing one body.
    pub const SHARED: &str = "a.example:80 b.example:80 {\n\tgzip\n\tlog /var/log/shared.log\n}\n";

    /// A settings file touching every key.
    pub const SETTINGS_TOML: &str = r#"from = "caddy"
to = "toml"
separator = "."
key_style = "percent"
compact = false
"#;
}
